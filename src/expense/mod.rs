//! Expenses: what the trip costs, tracked per day itinerary.
//!
//! Every expense mutation responds with the refreshed state of the affected
//! day and trip so that clients never display stale totals; see [aggregator].

mod aggregator;
mod core;
mod endpoints;

pub use aggregator::{
    DayTotalEntry, ExpenseMutationResult, ExpenseReport, build_expense_report,
    summarize_after_mutation,
};
pub use core::{
    Expense, ExpenseCategory, NewExpense, UpdatedExpense, create_expense, create_expense_table,
    delete_expense, get_day_total, get_expense, list_expenses_for_days, update_expense,
};
pub use endpoints::{
    create_expense_endpoint, delete_expense_endpoint, get_expense_report_endpoint,
    update_expense_endpoint,
};
