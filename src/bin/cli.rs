use teller::{Account, Caller, Ledger, Transaction, TransactionKind,
    config::StorageConfig,
    AccountId, Amount, CustomerId};

use std::path::PathBuf;
use anyhow::Context;
use colored::Colorize;
use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[clap(version, about, propagate_version = true)]
struct Cli {
    /// TOML file naming the snapshot files
    #[clap(short, long, value_parser)]
    config: Option<PathBuf>,

    /// Accounts snapshot, overrides the config file
    #[clap(long, value_parser)]
    accounts: Option<PathBuf>,

    /// Transactions snapshot, overrides the config file
    #[clap(long, value_parser)]
    transactions: Option<PathBuf>,

    /// Log debug output
    #[clap(short, long)]
    verbose: bool,

    /// Log errors only
    #[clap(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Action to perform
    #[clap(subcommand)]
    action: Subcommands,
}

#[derive(Debug, Subcommand)]
enum Subcommands {
    /// Open a new account with zero balance
    Open(Open),
    /// Show one account
    Show(Target),
    /// Change an account's number
    Renumber(Renumber),
    /// Close an account
    Close(Target),
    /// Add funds to an account
    Deposit(Movement),
    /// Take funds out of an account
    Withdraw(Movement),
    /// List an account's transactions, oldest first
    History(Target),
    /// List accounts, optionally of one customer
    List(List),
}

#[derive(Args, Debug)]
struct Open {
    /// Account number, free form
    #[clap(short = 'n', long, value_parser)]
    number: String,

    /// Owning customer
    #[clap(short = 'c', long, value_parser)]
    customer: CustomerId
}

#[derive(Args, Debug)]
struct Target {
    #[clap(value_parser)]
    id: AccountId
}

#[derive(Args, Debug)]
struct Renumber {
    #[clap(value_parser)]
    id: AccountId,

    #[clap(short = 'n', long, value_parser)]
    number: String
}

#[derive(Args, Debug)]
struct Movement {
    #[clap(value_parser)]
    id: AccountId,

    #[clap(short = 'a', long, value_parser)]
    amount: Amount
}

#[derive(Args, Debug)]
struct List {
    #[clap(short = 'c', long, value_parser)]
    customer: Option<CustomerId>
}

impl Cli {
    fn storage(&self) -> anyhow::Result<StorageConfig> {
        let mut storage = match &self.config {
            Some(path) => StorageConfig::read(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => StorageConfig::default()
        };
        if let Some(accounts) = &self.accounts {
            storage.accounts = accounts.clone();
        }
        if let Some(transactions) = &self.transactions {
            storage.transactions = transactions.clone();
        }
        storage.validate()?;
        Ok(storage)
    }

    fn init_logging(&self) {
        let level = if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        };
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    }
}

fn print_account(account: &Account) {
    let balance = if account.balance > 0.0 {
        format!("{}", account.balance).green()
    } else {
        format!("{}", account.balance).normal()
    };
    println!("{} {} (customer {}): {}",
        format!("#{}", account.id).bold(), account.account_number, account.customer_id, balance);
}

fn print_transaction(transaction: &Transaction) {
    let line = transaction.to_string();
    match transaction.kind {
        TransactionKind::Deposit => println!("{}", line.green()),
        TransactionKind::Withdrawal => println!("{}", line.bright_red())
    }
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    args.init_logging();

    let storage = args.storage()?;
    storage.prepare()?;
    let ledger = Ledger::open_json(&storage)
        .with_context(|| "failed to load ledger snapshots")?;
    let operator = Caller::System;

    match args.action {
        Subcommands::Open(open) => {
            print_account(&ledger.create_account(&operator, &open.number, open.customer)?);
        },
        Subcommands::Show(target) => {
            print_account(&ledger.get_account(&operator, target.id)?);
        },
        Subcommands::Renumber(renumber) => {
            print_account(&ledger.update_account(&operator, renumber.id, &renumber.number)?);
        },
        Subcommands::Close(target) => {
            ledger.delete_account(&operator, target.id)?;
            println!("closed account {}", target.id);
        },
        Subcommands::Deposit(movement) => {
            let receipt = ledger.deposit(&operator, movement.id, movement.amount)?;
            print_transaction(&receipt.transaction);
            println!("balance: {}", receipt.new_balance);
        },
        Subcommands::Withdraw(movement) => {
            let receipt = ledger.withdraw(&operator, movement.id, movement.amount)?;
            print_transaction(&receipt.transaction);
            println!("balance: {}", receipt.new_balance);
        },
        Subcommands::History(target) => {
            for transaction in ledger.transaction_history(&operator, target.id)? {
                print_transaction(&transaction);
            }
        },
        Subcommands::List(list) => {
            let accounts = match list.customer {
                Some(customer) => ledger.list_accounts(&operator, customer)?,
                None => ledger.list_all_accounts(&operator)?
            };
            for account in &accounts {
                print_account(account);
            }
        }
    }

    Ok(())
}
