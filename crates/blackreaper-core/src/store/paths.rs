//! Hierarchical store paths used across the application.

/// RC-cell balance for a user.
pub fn rc_cells(user_id: &str) -> String {
    format!("users/{user_id}/rc_cells")
}

/// Aggregate completion counters for a user.
pub fn user_stats(user_id: &str) -> String {
    format!("users/{user_id}/stats")
}

/// Append-only reward transaction log for a user.
pub fn transactions(user_id: &str) -> String {
    format!("transactions/{user_id}")
}

/// All pomodoro session records for a user.
pub fn sessions(user_id: &str) -> String {
    format!("pomodoros/{user_id}")
}

/// A single pomodoro session record.
pub fn session(user_id: &str, session_id: &str) -> String {
    format!("pomodoros/{user_id}/{session_id}")
}

/// A single task record.
pub fn task(user_id: &str, task_id: &str) -> String {
    format!("users/{user_id}/tasks/{task_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_are_scoped_per_user() {
        assert_eq!(rc_cells("u1"), "users/u1/rc_cells");
        assert_eq!(user_stats("u1"), "users/u1/stats");
        assert_eq!(transactions("u1"), "transactions/u1");
        assert_eq!(session("u1", "s9"), "pomodoros/u1/s9");
        assert_eq!(task("u1", "t3"), "users/u1/tasks/t3");
    }
}
