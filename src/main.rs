// main.rs — CLI surface and the once-per-invocation sequence:
// parse flags → read env overrides → read persisted preference → probe the
// host → resolve → launch. Everything below main() lives in the modules.
mod checkout;
mod config;
mod exec;
mod launch;
mod logging;
mod probe;
mod settings;

use clap::Parser;
use tracing::debug;

#[derive(Parser, Debug)]
#[command(
    name = "switchboard",
    version,
    disable_version_flag = true,
    about = "Bootstraps the Switchboard hub in a container or as a local Node.js process"
)]
struct Cli {
    /// How to run the hub: 'docker' or 'node' (default: computed from the host)
    #[arg(short = 'l', long = "launch_method", value_name = "METHOD")]
    launch_method: Option<String>,

    /// Release channel for the image and the settings template
    #[arg(short = 'c', long = "channel", value_name = "CHANNEL")]
    channel: Option<String>,

    /// Sync the checkout and pull the latest image before launching (default)
    #[arg(short = 'u', long = "update", overrides_with = "no_update")]
    update: bool,

    /// Skip every update step
    #[arg(long = "no-update")]
    no_update: bool,

    /// Print version
    #[allow(dead_code)] // ArgAction::Version exits inside clap; never read here
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

impl Cli {
    /// Update defaults to on; `--update`/`--no-update` see-saw, last one wins.
    fn update_enabled(&self) -> bool {
        self.update || !self.no_update
    }
}

/// The update flag must be computed before the option fields move out of
/// `cli`, so this consumes the whole struct in one place.
fn cli_options(cli: Cli) -> config::CliOptions {
    let update = cli.update_enabled();
    config::CliOptions {
        launch_method: cli.launch_method,
        channel: cli.channel,
        update,
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let env = config::EnvOverrides::from_env();
    let home = config::home_dir(&env)?;

    // The persisted preference sits below env vars and flags in precedence,
    // so it is read before resolution and passed in as one more input.
    let settings_file = home.join(settings::SETTINGS_FILE_NAME);
    let persisted_channel = settings::read_channel_preference(&settings_file);

    let probe = probe::probe();
    let cli_options = cli_options(cli);
    let resolved = config::resolve(&cli_options, &env, persisted_channel.as_deref(), &probe)?;
    debug!(?resolved, "resolved configuration");

    launch::launch(&resolved, &probe)
}

fn main() {
    // Parse errors exit 1 like every other fatal condition; --help and
    // --version also land in the Err arm but are success paths.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };
    logging::init();
    if let Err(err) = run(cli) {
        eprintln!("[switchboard] error: {err:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn update_defaults_on() {
        let cli = Cli::parse_from(["switchboard"]);
        assert!(cli.update_enabled());
    }

    #[test]
    fn no_update_turns_it_off() {
        let cli = Cli::parse_from(["switchboard", "--no-update"]);
        assert!(!cli.update_enabled());
    }

    #[test]
    fn last_update_flag_wins() {
        let cli = Cli::parse_from(["switchboard", "--no-update", "--update"]);
        assert!(cli.update_enabled());
        let cli = Cli::parse_from(["switchboard", "-u", "--no-update"]);
        assert!(!cli.update_enabled());
    }

    #[test]
    fn concatenated_short_method_form() {
        let cli = Cli::parse_from(["switchboard", "-lnode"]);
        assert_eq!(cli.launch_method.as_deref(), Some("node"));
    }

    #[test]
    fn options_extraction_keeps_flags_and_update() {
        let opts = cli_options(Cli::parse_from(["switchboard", "-lnode", "-c", "beta"]));
        assert_eq!(opts.launch_method.as_deref(), Some("node"));
        assert_eq!(opts.channel.as_deref(), Some("beta"));
        assert!(opts.update);

        let opts = cli_options(Cli::parse_from(["switchboard", "--no-update"]));
        assert!(!opts.update);
    }

    #[test]
    fn unknown_argument_is_a_failure() {
        let err = Cli::try_parse_from(["switchboard", "--bogus"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn help_and_version_are_not_failures() {
        let err = Cli::try_parse_from(["switchboard", "--help"]).unwrap_err();
        assert!(!err.use_stderr());
        let err = Cli::try_parse_from(["switchboard", "-v"]).unwrap_err();
        assert!(!err.use_stderr());
    }
}
