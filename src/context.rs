use std::path::Path;

use crate::config::Config;

/// Facts about the host that help the model pick the right commands.
#[derive(Clone)]
pub struct Context {
    operating_system: String,
    shell: String,
    pwd: Option<String>,
}

impl From<&Config> for Context {
    fn from(config: &Config) -> Self {
        Self {
            operating_system: std::env::consts::OS.to_string(),
            shell: shell_name(std::env::var("SHELL").ok().as_deref()),
            pwd: config
                .pwd
                .then(|| std::env::current_dir().ok())
                .flatten()
                .map(|dir| dir.display().to_string()),
        }
    }
}

impl From<Context> for String {
    fn from(value: Context) -> Self {
        Self::new()
            + &format!("The system you are running is a {} machine.\n", value.operating_system)
            + &format!("The shell you are running is {}. You are allowed to use {} specific features.\n", value.shell, value.shell)
            + &value.pwd.map_or(Self::new(), |cwd| format!("You are currently in folder: {cwd}\n"))
    }
}

fn shell_name(shell: Option<&str>) -> String {
    shell
        .and_then(|path| Path::new(path).file_name())
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("sh")
        .to_string()
}
