use clap::Subcommand;

use crate::common;

#[derive(Subcommand)]
pub enum TimerAction {
    /// Start a new session
    Start,
    /// Pause the running session
    Pause,
    /// Resume a paused session
    Resume,
    /// Advance the countdown; completes the session if it elapsed
    Tick,
    /// Complete the session now (work sessions award RC)
    End,
    /// Cancel the session without completing it
    Cancel,
    /// Print current timer state as JSON
    Status,
}

pub fn run(action: TimerAction) -> Result<(), Box<dyn std::error::Error>> {
    let rt = common::runtime()?;
    rt.block_on(async {
        let session = common::open().await?;
        let svc = session.ctx.session();

        let event = match action {
            TimerAction::Start => svc.start().await,
            TimerAction::Pause => svc.pause().await,
            TimerAction::Resume => svc.resume().await,
            TimerAction::Tick => svc.tick().await,
            TimerAction::End => svc.end_session().await,
            TimerAction::Cancel => svc.cancel().await,
            TimerAction::Status => {
                common::print_json(&svc.snapshot())?;
                session.persist()?;
                return Ok(());
            }
        };

        // Commands that changed nothing fall back to printing the state.
        match event {
            Some(event) => common::print_json(&event)?,
            None => common::print_json(&svc.snapshot())?,
        }
        session.persist()?;
        Ok(())
    })
}
