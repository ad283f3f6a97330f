use libtest_mimic::Arguments;
use libtest_mimic::Trial;
use stowage::error::Result;

mod operations;

pub use utils::*;

fn main() -> Result<()> {
    let args = Arguments::from_args();

    let client = init_test_service();
    let enabled = behavior_tests_enabled();
    if enabled {
        TEST_RUNTIME.block_on(ensure_bucket_exists(&client))?;
    }

    let mut tests = Vec::new();

    operations::list::tests(&client, &mut tests);
    operations::delete::tests(&client, &mut tests);
    operations::download::tests(&client, &mut tests);
    operations::upload::tests(&client, &mut tests);

    // Without a reachable service every trial is reported as ignored.
    let tests = tests
        .into_iter()
        .map(|trial| trial.with_ignored_flag(!enabled))
        .collect();

    let _ = tracing_subscriber::fmt()
        .pretty()
        .with_test_writer()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let conclusion = libtest_mimic::run(&args, tests);

    if enabled {
        TEST_RUNTIME.block_on(TEST_FIXTURE.cleanup(&client));
        TEST_FIXTURE.cleanup_local();
    }

    conclusion.exit()
}
