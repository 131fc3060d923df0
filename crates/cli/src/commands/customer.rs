use chrono::Utc;
use clap::{Args, Subcommand};

use sachet_core::domain::customer::NewCustomer;
use sachet_db::{CustomerRepository, SqlCustomerRepository};

use crate::commands::{
    build_runtime, finish, load_config, open_migrated_pool, CommandFailure, CommandResult,
};

#[derive(Debug, Subcommand)]
pub enum CustomerCommand {
    #[command(about = "Capture a new customer at the given GPS fix")]
    Add(AddArgs),
    #[command(about = "List every stored customer in creation order")]
    List,
}

#[derive(Debug, Args)]
pub struct AddArgs {
    #[arg(long)]
    pub business_name: String,
    #[arg(long)]
    pub phone: String,
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
    #[arg(long, default_value = "")]
    pub contact_name: String,
    #[arg(long, default_value = "")]
    pub gps_address: String,
    #[arg(long, default_value_t = 0, help = "Average weekly volume in bags")]
    pub bags: u32,
}

impl From<AddArgs> for NewCustomer {
    fn from(args: AddArgs) -> Self {
        Self {
            business_name: args.business_name,
            contact_name: args.contact_name,
            phone: args.phone,
            gps_address: args.gps_address,
            latitude: Some(args.lat),
            longitude: Some(args.lng),
            average_bags: args.bags,
        }
    }
}

pub fn run(command: CustomerCommand) -> CommandResult {
    match command {
        CustomerCommand::Add(args) => add(args),
        CustomerCommand::List => list(),
    }
}

fn add(args: AddArgs) -> CommandResult {
    const COMMAND: &str = "customer add";

    let customer = match NewCustomer::from(args).into_customer(Utc::now()) {
        Ok(customer) => customer,
        Err(error) => return CommandResult::failure(COMMAND, "validation", error.to_string(), 6),
    };
    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let repo = SqlCustomerRepository::new(pool.clone());
        repo.save(customer.clone())
            .await
            .map_err(|error| ("persistence", error.to_string(), 5u8))?;
        pool.close().await;

        let data = serde_json::to_value(&customer)
            .map_err(|error| ("serialization", error.to_string(), 5u8))?;
        Ok::<_, CommandFailure>(CommandResult::with_data(
            COMMAND,
            format!("saved customer {}", customer.id),
            data,
        ))
    });

    finish(COMMAND, result)
}

fn list() -> CommandResult {
    const COMMAND: &str = "customer list";

    let config = match load_config(COMMAND) {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime(COMMAND) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        let customers = SqlCustomerRepository::new(pool.clone())
            .list()
            .await
            .map_err(|error| ("persistence", error.to_string(), 5u8))?;
        pool.close().await;

        let data = serde_json::to_value(&customers)
            .map_err(|error| ("serialization", error.to_string(), 5u8))?;
        Ok::<_, CommandFailure>(CommandResult::with_data(
            COMMAND,
            format!("{} customers", customers.len()),
            data,
        ))
    });

    finish(COMMAND, result)
}

#[cfg(test)]
mod tests {
    use sachet_core::domain::customer::NewCustomer;

    use super::AddArgs;

    #[test]
    fn add_args_always_carry_both_coordinates() {
        let new_customer = NewCustomer::from(AddArgs {
            business_name: "Osu Kiosk".to_string(),
            phone: "0244000000".to_string(),
            lat: 5.6037,
            lng: -0.187,
            contact_name: String::new(),
            gps_address: String::new(),
            bags: 12,
        });

        assert_eq!(new_customer.latitude, Some(5.6037));
        assert_eq!(new_customer.longitude, Some(-0.187));
        assert_eq!(new_customer.average_bags, 12);
    }
}
