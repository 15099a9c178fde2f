use std::io::{self, Write};

use clap::Parser;
use crossterm::style::Stylize;

use crate::config::Config;
use crate::confirm::{self, ConfirmInput};
use crate::doer::Doer;
use crate::{BackendKind, DoerError};

#[derive(Parser, Clone)]
#[command(name = "heydo", author, version, about, long_about = None)]
pub struct HeydoArgs {
    /// Print prompts and raw model output
    #[arg(long, overrides_with = "no_debug")]
    debug: bool,

    #[arg(long, overrides_with = "debug")]
    no_debug: bool,

    /// Do not ask for confirmation
    #[arg(short, long, overrides_with = "no")]
    yes: bool,

    /// Always ask for confirmation
    #[arg(short, long, overrides_with = "yes")]
    no: bool,

    #[arg(long, value_enum, ignore_case = true)]
    model: Option<BackendKind>,

    /// Neither read nor write the response cache file
    #[arg(long)]
    no_cache: bool,

    /// What the command should do
    #[arg(required = true, trailing_var_arg = true)]
    request: Vec<String>,
}

impl HeydoArgs {
    /// Applies the flags given on the command line on top of `config`.
    fn apply(&self, mut config: Config) -> Config {
        if self.debug {
            config.debug = true;
        } else if self.no_debug {
            config.debug = false;
        }
        if self.yes {
            config.yes = true;
        } else if self.no {
            config.yes = false;
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if self.no_cache {
            config.cache = false;
        }
        config
    }
}

fn init_logger(debug: bool) {
    let level = if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_timestamp(None)
        .init();
}

#[allow(clippy::missing_errors_doc)]
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = HeydoArgs::parse();
    let file_config = match Config::default_path() {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    let config = args.apply(file_config);
    init_logger(config.debug);

    let kind = config.model;
    let mut doer = Doer::new(kind.build(&config), &config);
    doer.load_bot()?;

    let mut input = confirm::stdin_confirm();
    let mut stdout = io::stdout();
    run_doer(&mut doer, &args.request, config.yes, input.as_mut(), &mut stdout).await?;
    Ok(())
}

/// Runs one request through `doer`: shows what the model proposes and runs it
/// once approved, either by `yes` or by the user.
pub async fn run_doer(
    doer: &mut Doer,
    request: &[String],
    yes: bool,
    input: &mut dyn ConfirmInput,
    out: &mut dyn Write,
) -> Result<(), DoerError> {
    let response = doer.query(&request.join(" ")).await?;
    write_out(out, &format!("{}\n", response.explanation.as_str().bold()))?;
    if response.commands.is_empty() {
        return Ok(());
    }
    write_out(out, &format!("{}\n", response.commands.join("\n").green()))?;
    let approved = yes || confirm::confirm("Execute this command?", input, out)?;
    if approved {
        write_out(out, "\n")?;
        doer.execute(&response)?;
    }
    Ok(())
}

fn write_out(out: &mut dyn Write, text: &str) -> Result<(), DoerError> {
    out.write_all(text.as_bytes())?;
    out.flush()?;
    Ok(())
}
