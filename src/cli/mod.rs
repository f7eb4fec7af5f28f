use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use crate::application::{BillingService, CustomerFilter};
use crate::domain::{format_amount, parse_amount, Customer};
use crate::upstream::HttpSnapshotFetcher;

/// Saldo - Prepaid-account debt ledger
#[derive(Parser)]
#[command(name = "saldo")]
#[command(about = "A debt ledger for prepaid-account resellers, reconciled against an upstream billing API")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "saldo.db")]
    pub database: String,

    /// Upstream billing API base URL (falls back to SALDO_API_URL)
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Owner management commands
    #[command(subcommand)]
    Owner(OwnerCommands),

    /// Customer management commands
    #[command(subcommand)]
    Customer(CustomerCommands),

    /// Register a debt against a customer's balance
    Debt {
        /// Amount to add to the debt balance (e.g., "25000" or "25,000")
        amount: String,

        /// Owner name
        #[arg(long)]
        owner: String,

        /// Customer username
        #[arg(long)]
        username: String,
    },

    /// Register a payment against a customer's balance
    Payment {
        /// Amount paid (e.g., "25000" or "25,000")
        amount: String,

        /// Owner name
        #[arg(long)]
        owner: String,

        /// Customer username
        #[arg(long)]
        username: String,
    },

    /// List a customer's payment history
    Payments {
        /// Owner name
        #[arg(long)]
        owner: String,

        /// Customer username
        #[arg(long)]
        username: String,
    },

    /// List the distinct agent names across an owner's customers
    Agents {
        /// Owner name
        #[arg(long)]
        owner: String,
    },

    /// Show aggregate statistics for an owner
    Stats {
        /// Owner name
        #[arg(long)]
        owner: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Reconcile expired customers against the upstream billing API
    Reconcile {
        /// Limit the pass to a single owner
        #[arg(long)]
        owner: Option<String>,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

#[derive(Subcommand)]
pub enum OwnerCommands {
    /// Create a new owner
    Create {
        /// Owner name (must be unique)
        name: String,
    },

    /// List all owners
    List,
}

#[derive(Subcommand)]
pub enum CustomerCommands {
    /// Register a new customer (fetches the initial account snapshot)
    Add {
        /// Upstream account username (must be unique)
        username: String,

        /// Upstream account password
        password: String,

        /// Owner name
        #[arg(long)]
        owner: String,

        /// Initial debt balance
        #[arg(long, default_value = "0")]
        debt: String,
    },

    /// List an owner's customers
    List {
        /// Owner name
        #[arg(long)]
        owner: String,

        /// Filter by username
        #[arg(long)]
        username: Option<String>,

        /// Filter by full name
        #[arg(long)]
        name: Option<String>,

        /// Filter by agent name
        #[arg(long)]
        agent: Option<String>,
    },

    /// Show detailed customer information
    Show {
        /// Customer username
        username: String,

        /// Owner name
        #[arg(long)]
        owner: String,
    },

    /// Refresh a customer's profile from the upstream account
    Refresh {
        /// Customer username
        username: String,

        /// Owner name
        #[arg(long)]
        owner: String,
    },
}

impl Cli {
    fn fetcher(&self) -> Result<HttpSnapshotFetcher> {
        let base = self
            .api_url
            .clone()
            .or_else(|| std::env::var("SALDO_API_URL").ok())
            .context("Upstream API URL not configured. Pass --api-url or set SALDO_API_URL")?;
        HttpSnapshotFetcher::new(base)
    }

    pub async fn run(self) -> Result<()> {
        match &self.command {
            Commands::Init => {
                BillingService::init(&self.database).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Owner(owner_cmd) => {
                let service = BillingService::connect(&self.database).await?;
                run_owner_command(&service, owner_cmd).await?;
            }

            Commands::Customer(customer_cmd) => {
                let service = BillingService::connect(&self.database).await?;
                run_customer_command(&self, &service, customer_cmd).await?;
            }

            Commands::Debt {
                amount,
                owner,
                username,
            } => {
                let service = BillingService::connect(&self.database).await?;
                let new_balance = service.register_debt(owner, username, amount).await?;
                println!(
                    "Registered debt of {} for {}. New balance: {}",
                    amount,
                    username,
                    format_amount(new_balance)
                );
            }

            Commands::Payment {
                amount,
                owner,
                username,
            } => {
                let service = BillingService::connect(&self.database).await?;
                let result = service.register_payment(owner, username, amount).await?;
                println!(
                    "Registered payment of {} for {} ({}). New balance: {}",
                    format_amount(result.payment.amount),
                    username,
                    result.payment.id,
                    format_amount(result.new_balance)
                );
            }

            Commands::Payments { owner, username } => {
                let service = BillingService::connect(&self.database).await?;
                let payments = service.list_payments(owner, username).await?;

                if payments.is_empty() {
                    println!("No payments recorded for {}.", username);
                } else {
                    println!("{:<12} {:<20} {:<38}", "AMOUNT", "DATE", "ID");
                    println!("{}", "-".repeat(70));
                    for payment in payments {
                        println!(
                            "{:<12} {:<20} {:<38}",
                            format_amount(payment.amount),
                            payment.payment_date.format("%Y-%m-%d %H:%M:%S"),
                            payment.id
                        );
                    }
                }
            }

            Commands::Agents { owner } => {
                let service = BillingService::connect(&self.database).await?;
                let agents = service.unique_agents(owner).await?;

                if agents.is_empty() {
                    println!("No agents found for owner {}.", owner);
                } else {
                    for agent in agents {
                        println!("{}", agent);
                    }
                }
            }

            Commands::Stats { owner, format } => {
                let service = BillingService::connect(&self.database).await?;
                let stats = service.owner_statistics(owner).await?;

                match format.as_str() {
                    "json" => {
                        println!("{}", serde_json::to_string_pretty(&stats)?);
                    }
                    _ => {
                        println!("Statistics for owner: {}", stats.owner);
                        println!("  Customers:       {}", stats.total_customers);
                        println!("  In debt:         {}", stats.customers_in_debt);
                        println!("  Total debt:      {}", format_amount(stats.total_debt));
                        println!("  Total payments:  {}", format_amount(stats.total_payments));
                    }
                }
            }

            Commands::Reconcile { owner, format } => {
                let service = BillingService::connect(&self.database).await?;
                let fetcher = self.fetcher()?;

                let report = service.reconcile(owner.as_deref(), &fetcher).await?;

                match format.as_str() {
                    "json" => {
                        println!("{}", serde_json::to_string_pretty(&report)?);
                    }
                    _ => {
                        println!(
                            "Reconciled {} customer(s): {} renewed, {} unchanged, {} failed",
                            report.checked,
                            report.renewed.len(),
                            report.unchanged,
                            report.failures.len()
                        );

                        for renewal in &report.renewed {
                            println!(
                                "  {} charged {} until {}",
                                renewal.username,
                                format_amount(renewal.charged),
                                renewal.new_exp_date.format("%Y-%m-%d")
                            );
                        }

                        if !report.failures.is_empty() {
                            println!("\nFailures:");
                            for failure in &report.failures {
                                println!("  {}: {}", failure.username, failure.error);
                            }
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

async fn run_owner_command(service: &BillingService, cmd: &OwnerCommands) -> Result<()> {
    match cmd {
        OwnerCommands::Create { name } => {
            let owner = service.create_owner(name.clone()).await?;
            println!("Created owner: {}", owner.name);
        }

        OwnerCommands::List => {
            let owners = service.list_owners().await?;
            if owners.is_empty() {
                println!("No owners found.");
            } else {
                println!("{:<20} {:<12}", "NAME", "CREATED");
                println!("{}", "-".repeat(32));
                for owner in owners {
                    println!(
                        "{:<20} {:<12}",
                        owner.name,
                        owner.created_at.format("%Y-%m-%d")
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_customer_command(
    cli: &Cli,
    service: &BillingService,
    cmd: &CustomerCommands,
) -> Result<()> {
    match cmd {
        CustomerCommands::Add {
            username,
            password,
            owner,
            debt,
        } => {
            let initial_debt =
                parse_amount(debt).context("Invalid debt format. Use '25000' or '25,000'")?;
            let fetcher = cli.fetcher()?;

            let customer = service
                .register_customer(
                    owner,
                    username.clone(),
                    password.clone(),
                    initial_debt,
                    &fetcher,
                )
                .await?;

            println!(
                "Registered customer: {} ({}) expires {}",
                customer.username,
                customer.name,
                customer.exp_date.format("%Y-%m-%d")
            );
        }

        CustomerCommands::List {
            owner,
            username,
            name,
            agent,
        } => {
            let filter = CustomerFilter {
                username: username.clone(),
                name: name.clone(),
                agent_name: agent.clone(),
            };
            let customers = service.list_customers(owner, filter).await?;

            println!(
                "{:<16} {:<20} {:<14} {:<12} {:<12}",
                "USERNAME", "NAME", "AGENT", "DEBT", "EXPIRES"
            );
            println!("{}", "-".repeat(76));
            for customer in customers {
                println!(
                    "{:<16} {:<20} {:<14} {:<12} {:<12}",
                    customer.username,
                    customer.name,
                    customer.agent_name,
                    format_amount(customer.debt_amount),
                    customer.exp_date.format("%Y-%m-%d")
                );
            }
        }

        CustomerCommands::Show { username, owner } => {
            let customer = service.get_customer(owner, username).await?;
            print_customer(&customer);
        }

        CustomerCommands::Refresh { username, owner } => {
            let fetcher = cli.fetcher()?;
            let customer = service.refresh_customer(owner, username, &fetcher).await?;

            println!("Refreshed customer profile from upstream:");
            print_customer(&customer);
        }
    }
    Ok(())
}

fn print_customer(customer: &Customer) {
    println!("Customer: {}", customer.username);
    println!("  Name:          {}", customer.name);
    println!("  Mobile:        {}", customer.mobile_number);
    println!("  Agent:         {}", customer.agent_name);
    println!("  Account:       {}", customer.account_name);
    println!(
        "  Price:         {}",
        format_amount(customer.account_price)
    );
    println!("  Debt:          {}", format_amount(customer.debt_amount));
    println!(
        "  Expires:       {}",
        customer.exp_date.format("%Y-%m-%d %H:%M:%S")
    );
    println!(
        "  Registered:    {}",
        customer.created_at.format("%Y-%m-%d")
    );
}
