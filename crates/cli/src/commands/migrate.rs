use crate::commands::{
    build_runtime, finish, load_config, open_migrated_pool, CommandFailure, CommandResult,
};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match build_runtime("migrate") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let pool = open_migrated_pool(&config).await?;
        pool.close().await;
        Ok::<_, CommandFailure>(CommandResult::success("migrate", "applied pending migrations"))
    });

    finish("migrate", result)
}
