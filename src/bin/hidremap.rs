// hidremap Daemon
// Hooks input devices, runs them through the remap engine, emits via uinput

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::Parser;

use hidremap_core::device::{poll_timeout_ms, EventLoop, HookPolicy};
use hidremap_core::output::{EventOutput, LogOutput, UInputOutput};
use hidremap_core::{Config, RemapEngine, SystemClock};

/// How long to sleep in poll when no timer is armed, so shutdown is noticed
const IDLE_POLL_MS: i32 = 100;

/// Karabiner-style key, consumer key and pointer remapper
#[derive(Parser, Debug)]
#[command(name = "hidremap")]
#[command(version)]
#[command(about = "Remaps keyboard, media key and pointer events", long_about = None)]
struct Args {
    /// TOML configuration file (defaults to ~/.config/hidremap/config.toml)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Manually specify devices to remap (can be used multiple times)
    #[arg(short, long, value_name = "DEVICE")]
    devices: Vec<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Validate config and exit
    #[arg(long)]
    check_config: bool,

    /// List input devices and their detected roles
    #[arg(long)]
    list_devices: bool,

    /// Log translated events instead of emitting them; devices are not grabbed
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn config_path(&self) -> Result<PathBuf> {
        self.config
            .clone()
            .or_else(Config::default_path)
            .ok_or_else(|| anyhow!("no --config given and no config directory available"))
    }
}

struct Application {
    config: Config,
    args: Args,
    running: Arc<AtomicBool>,
}

impl Application {
    fn new(args: Args) -> Result<Self> {
        let path = args.config_path()?;
        let config = Config::from_toml_path(&path)
            .with_context(|| format!("loading {}", path.display()))?;
        log::info!("Loaded {} rule(s) from {}", config.rules.len(), path.display());
        Ok(Self {
            config,
            args,
            running: Arc::new(AtomicBool::new(true)),
        })
    }

    fn validate(&self) -> Result<()> {
        println!("Configuration is valid");
        for rule in &self.config.rules {
            let state = if rule.enabled { "" } else { " (disabled)" };
            println!("  - {}: {}{}", rule.name, rule.def.kind(), state);
        }
        Ok(())
    }

    fn list_devices() -> Result<()> {
        let devices = EventLoop::list_devices()?;
        println!("Found {} input device(s):", devices.len());
        for device in &devices {
            println!(
                "  {}: {} ({}) {:?}",
                device.index, device.name, device.path, device.role
            );
        }
        Ok(())
    }

    fn install_signal_handler(&self) -> Result<()> {
        use signal_hook::consts::{SIGINT, SIGTERM};
        use signal_hook::iterator::Signals;

        let mut signals = Signals::new([SIGINT, SIGTERM]).context("installing signal handler")?;
        let running = self.running.clone();
        std::thread::spawn(move || {
            if let Some(signal) = signals.forever().next() {
                log::info!("Received signal {}, shutting down", signal);
                running.store(false, Ordering::SeqCst);
            }
        });
        Ok(())
    }

    fn run(&self) -> Result<()> {
        self.install_signal_handler()?;

        let policy = HookPolicy::from_config(&self.config, &self.args.devices);
        let mut event_loop = EventLoop::open(&policy, !self.args.dry_run)?;
        log::info!("Hooked {} device(s)", event_loop.device_count());

        let output: Box<dyn EventOutput + Send> = if self.args.dry_run {
            Box::new(LogOutput)
        } else {
            Box::new(UInputOutput::new()?)
        };
        let mut engine = RemapEngine::from_config(&self.config, output, Arc::new(SystemClock));
        engine.initialize();

        println!("hidremap is running. Press Ctrl+C to exit.");
        let result = self.main_loop(&mut event_loop, &mut engine);

        engine.terminate();
        event_loop.ungrab_all();
        result
    }

    fn main_loop(&self, event_loop: &mut EventLoop, engine: &mut RemapEngine) -> Result<()> {
        while self.running.load(Ordering::SeqCst) {
            let timeout = poll_timeout_ms(engine.next_deadline(), Instant::now(), IDLE_POLL_MS)
                .min(IDLE_POLL_MS);
            for event in event_loop.poll_events(timeout)? {
                engine.handle_event(event);
            }
            engine.dispatch_timers();
        }
        Ok(())
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.list_devices {
        return Application::list_devices();
    }

    let app = Application::new(args)?;
    if app.args.check_config {
        return app.validate();
    }
    app.run()
}
