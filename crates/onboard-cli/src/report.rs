//! Console output for an onboarding run

use onboard_core::{unlocked, Address, FundingAction, FundingReport, User};

const RULE: &str = "───────────────────────────────────────────────────────────────────────────────";

/// Print the node's accounts
pub fn print_accounts(accounts: &[Address]) {
    println!("Number of accounts: {}", accounts.len());
    for account in accounts {
        println!("  {}", account);
    }
}

/// Print the unlocked users with their balances
pub fn print_users(title: &str, users: &[User]) {
    let selected = unlocked(users);
    println!("{}", RULE);
    println!("{} ({} of {} unlocked)", title, selected.len(), users.len());
    println!("{}", RULE);
    for user in selected {
        println!("{}", user);
    }
}

/// Print one line per funded user
pub fn print_funding(report: &FundingReport) {
    for outcome in &report.outcomes {
        match &outcome.action {
            FundingAction::Funded {
                amount,
                tx,
                block_number,
            } => {
                let block = block_number
                    .map(|b| b.to_string())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "  {} requested {} token (tx {}, block {})",
                    outcome.address.short(),
                    amount,
                    tx,
                    block
                );
            }
            FundingAction::AlreadyFunded { balance } => {
                println!("  {} already holds {} token", outcome.address.short(), balance);
            }
            FundingAction::Skipped => {}
        }
    }
    println!(
        "Funded {} user(s), {} token requested",
        report.funded(),
        report.total_requested()
    );
}
