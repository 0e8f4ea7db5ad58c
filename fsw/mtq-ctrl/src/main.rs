use std::{
    fs::File,
    io::{self, Read, Write},
    path::PathBuf,
};

use acs::{
    BcrossLaw, ControlLawProvider, Controller, ControllerConfig, IndexSchema, nalgebra::Vector3,
};
use clap::Parser;
use mlua::LuaSerdeExt;
use tracing::{error, info};

#[derive(Parser, Clone)]
#[command(version, about, long_about = None)]
struct Args {
    #[clap(default_value = "/root/mtq-ctrl.lua")]
    config_path: PathBuf,
    /// CSV of estimated states, one tick per row, in the packed layout.
    #[clap(long)]
    states: PathBuf,
}

fn load_config(script: Option<String>) -> anyhow::Result<ControllerConfig> {
    let mut config = ControllerConfig::default();
    if let Some(script) = script {
        let lua = mlua::Lua::new();
        let config_val = lua.to_value(&config)?;
        lua.globals().set("config", config_val)?;
        lua.load(script).exec()?;
        config = lua.from_value(lua.globals().get("config")?)?;
    }
    Ok(config)
}

/// The only control law this binary can fly on its own is B-cross; the
/// sun-pointing laws are provided by the mission integration.
fn provider(config: &ControllerConfig) -> anyhow::Result<Option<Box<dyn ControlLawProvider>>> {
    if config.algorithm != "Bcross" {
        return Ok(None);
    }
    let law = BcrossLaw::new(
        config.bcross_gain,
        Vector3::from(config.tgt_ang_vel),
        &config.geometry()?,
    )?;
    Ok(Some(Box::new(law)))
}

/// Runs one tick per CSV row and writes one voltage row per successful tick.
/// Returns the number of failed ticks.
fn replay(
    controller: &mut Controller,
    schema: &IndexSchema,
    states: impl Read,
    out: impl Write,
) -> anyhow::Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(states);
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(out);
    let mut failed = 0;
    for (tick, record) in reader.records().enumerate() {
        let state = record?
            .iter()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()?;
        if state.len() != schema.state_len() {
            error!(
                tick,
                len = state.len(),
                expected = schema.state_len(),
                "malformed state row"
            );
            failed += 1;
            continue;
        }
        match controller.run(&state, schema) {
            Ok(voltages) => writer.write_record(voltages.iter().map(f64::to_string))?,
            Err(err) => {
                // no command is emitted for a failed tick
                error!(tick, %err, "control tick failed");
                failed += 1;
            }
        }
    }
    writer.flush()?;
    Ok(failed)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    let config = load_config(std::fs::read_to_string(&args.config_path).ok())?;
    info!(?config, "loaded config");

    let geometry = config.geometry()?;
    let schema = IndexSchema::packed(geometry.n_rw(), geometry.n_mtb());
    let mut controller = Controller::new(&config, provider(&config)?)?;
    info!(algorithm = ?controller.algorithm(), "controller ready");
    let failed = replay(
        &mut controller,
        &schema,
        File::open(&args.states)?,
        io::stdout().lock(),
    )?;
    if failed > 0 {
        error!(failed, "ticks failed during replay");
    }
    Ok(())
}
