use clap::Subcommand;

use crate::common;

#[derive(Subcommand)]
pub enum StatsAction {
    /// Print completion counters as JSON
    Show,
}

pub fn run(action: StatsAction) -> Result<(), Box<dyn std::error::Error>> {
    let rt = common::runtime()?;
    rt.block_on(async {
        let session = common::open().await?;
        match action {
            StatsAction::Show => {
                let stats = session
                    .ctx
                    .stats()
                    .fetch(session.ctx.user_id())
                    .await?;
                common::print_json(&stats)?;
            }
        }
        session.persist()?;
        Ok(())
    })
}
