//! Logger initialisation: an `env_logger` builder reading its filter from a
//! project-specific environment variable, falling back to `info`.

use env_logger::Env;

pub fn init_logger() {
    let env = Env::default().filter_or("FR_LOG", "info").write_style_or("FR_LOG_STYLE", "auto");
    env_logger::Builder::from_env(env).init();
}
