//! Plain-text rendering of command results.

use ledgercache_core::models::{CachedTransaction, FinancialSummary};
use ledgercache_core::sync::{
    BackupReport, RestoreReport, RestoreSkip, TransactionBackup, TransactionRestore, UserBackup,
};
use ledgercache_core::utils::{format_amount, format_date, format_optional, truncate_string};
use ledgercache_core::SessionContext;

const DESCRIPTION_WIDTH: usize = 28;
const CATEGORY_WIDTH: usize = 14;

pub fn format_id(id: Option<i64>) -> String {
    id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())
}

pub fn print_transactions(transactions: &[CachedTransaction]) {
    if transactions.is_empty() {
        println!("No transactions");
        return;
    }

    println!(
        "{:>6}  {:<12}  {:<7}  {:>12}  {:<cw$}  {}",
        "ID",
        "Date",
        "Type",
        "Amount",
        "Category",
        "Description",
        cw = CATEGORY_WIDTH
    );
    for t in transactions {
        let date = t.date.as_deref().map(format_date).unwrap_or_default();
        println!(
            "{:>6}  {:<12}  {:<7}  {:>12}  {:<cw$}  {}",
            format_id(t.id),
            date,
            t.kind.to_string(),
            format_amount(t.signed_amount()),
            truncate_string(&format_optional(&t.category, "-"), CATEGORY_WIDTH),
            truncate_string(&format_optional(&t.description, ""), DESCRIPTION_WIDTH),
            cw = CATEGORY_WIDTH
        );
    }
}

pub fn print_summary(summary: &FinancialSummary) {
    println!("Income:   {:>14}", format_amount(summary.income));
    println!("Expense:  {:>14}", format_amount(summary.expense));
    println!("Balance:  {:>14}", format_amount(summary.balance));
}

pub fn print_profile(session: &SessionContext) {
    println!("ID:        {}", session.user_id());
    println!("Username:  {}", session.username());
    println!("Email:     {}", format_optional(&session.user.email, "-"));
}

pub fn print_backup(report: &BackupReport) {
    let users = match report.users {
        UserBackup::Remote { count } => format!("{} backed up", count),
        UserBackup::CurrentUserOnly => "current user only".to_string(),
        UserBackup::Skipped => "skipped".to_string(),
        UserBackup::Failed => "failed".to_string(),
    };
    let transactions = match report.transactions {
        TransactionBackup::Saved { count } => format!("{} backed up", count),
        TransactionBackup::NoSession => "skipped, not logged in".to_string(),
        TransactionBackup::Failed => "failed".to_string(),
    };
    println!("Backup: users {}, transactions {}", users, transactions);
}

pub fn print_restore(report: &RestoreReport) {
    let RestoreReport::Restored {
        users,
        transactions,
    } = report
    else {
        println!("Backend unavailable, working from the local backup");
        return;
    };

    println!(
        "Users: {} present, {} recreated, {} failed, {} skipped",
        users.present.len(),
        users.created,
        users.failed,
        users.skipped
    );
    match transactions {
        TransactionRestore::Replayed {
            batches,
            restored,
            failed,
        } => println!(
            "Transactions: {} restored in {} batches, {} failed",
            restored,
            batches.len(),
            failed
        ),
        TransactionRestore::Skipped(RestoreSkip::NoSession) => {
            println!("Transactions: skipped, not logged in")
        }
        TransactionRestore::Skipped(RestoreSkip::NothingCached) => {
            println!("Transactions: nothing in the local backup")
        }
        TransactionRestore::Skipped(RestoreSkip::RemoteHasData { count }) => {
            println!("Transactions: backend already has {}, nothing replayed", count)
        }
    }
}
