use anyhow::Result;
use vktiny_shader::command::compile_all;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    compile_all()?;
    Ok(())
}
