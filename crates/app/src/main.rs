mod cli;
mod logging;
mod report;
mod source;

use clap::Parser;

fn run(args: &cli::Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = native::NativeConfig::load_or_default(args.config.as_deref())?;
    let source = source::SourceFile::open(&args.file)?;
    let engine = std::rc::Rc::new(engine_sim::SimEngine::with_text(source.as_slice()));
    let editor = editor_bridge::Editor::new(engine.clone())?;

    // SAFETY: the simulated engine only delivers records it built itself.
    engine.set_notify_target(unsafe { editor.notify_hook() });

    tracing::debug!(file = %source.path().display(), "probing");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    report::write_stats(&mut out, source.path(), &editor)?;
    report::write_module(&mut out, &config)?;
    report::write_queries(
        &mut out,
        &editor,
        &report::Queries {
            chars: &args.chars,
            bytes: &args.bytes,
            lines: &args.lines,
        },
    )?;

    Ok(())
}

pub fn main() -> std::process::ExitCode {
    logging::init();

    let args = cli::Args::parse();

    match run(&args) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "probe failed");
            eprintln!("sci-probe: {err}");
            std::process::ExitCode::FAILURE
        }
    }
}
