use clap::Subcommand;

use blackreaper_core::RewardKind;

use crate::common;

#[derive(Subcommand)]
pub enum LedgerAction {
    /// Print the current RC-cell balance
    Balance,
    /// Print the transaction history, oldest first
    History {
        /// Show only the most recent N entries
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Apply a manual balance adjustment (negative amounts debit)
    Adjust { amount: i64 },
}

pub fn run(action: LedgerAction) -> Result<(), Box<dyn std::error::Error>> {
    let rt = common::runtime()?;
    rt.block_on(async {
        let session = common::open().await?;
        let user_id = session.ctx.user_id().to_string();

        match action {
            LedgerAction::Balance => {
                let balance = session.ctx.ledger().balance(&user_id).await?;
                println!("{balance}");
            }
            LedgerAction::History { limit } => {
                let mut history = session.ctx.ledger().history(&user_id).await?;
                if let Some(limit) = limit {
                    let skip = history.len().saturating_sub(limit);
                    history.drain(..skip);
                }
                common::print_json(&history)?;
            }
            LedgerAction::Adjust { amount } => {
                let record = session
                    .ctx
                    .ledger()
                    .award(&user_id, amount, RewardKind::ManualAdjustment, None)
                    .await?;
                common::print_json(&record)?;
            }
        }
        session.persist()?;
        Ok(())
    })
}
