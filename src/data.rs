use crate::models::{Payout, Standing};
use anyhow::{Context, Result};

/// Save season standings to CSV
pub fn save_standings_to_csv(standings: &[Standing], filename: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    for standing in standings {
        writer
            .serialize(standing)
            .context("Failed to write standing row")?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}

/// Save the payout ledger to CSV
pub fn save_payouts_to_csv(payouts: &[Payout], filename: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(filename).context("Failed to create CSV file")?;

    for payout in payouts {
        writer
            .serialize(payout)
            .context("Failed to write payout row")?;
    }

    writer.flush().context("Failed to flush CSV file")?;
    Ok(())
}
