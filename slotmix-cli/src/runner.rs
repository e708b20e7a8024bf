use std::error::Error;
use std::fs;
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use clap::ArgMatches;
use log::{debug, error, info, warn};
use slotmix_lib::{
    AudioAsset, AudioChannel, EngineSettings, MixEngine, OutputDevice, OutputSpec, QueueDevice,
    SharedChannel, CHANNEL_MAX,
};

use crate::logging::{self, LogBuffer};

/// Options for the host tick loop.
#[derive(Debug, Clone, Copy)]
struct TickOptions {
    tick_hz: u32,
    stagger_ms: u64,
}

impl TickOptions {
    fn tick(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_hz as f64)
    }

    /// Frames a device plays during one tick.
    fn frames_per_tick(&self, sample_rate: u32) -> usize {
        (sample_rate / self.tick_hz).max(1) as usize
    }

    /// Tick at which input `index` is started.
    fn start_tick(&self, index: usize) -> u64 {
        (index as u64)
            .saturating_mul(self.stagger_ms)
            .saturating_mul(self.tick_hz as u64)
            / 1000
    }
}

/// Totals for the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct RunStats {
    ticks: u64,
    frames_mixed: u64,
}

pub fn run(args: &ArgMatches, log_buffer: LogBuffer) -> Result<i32, Box<dyn Error>> {
    let quiet = args.get_flag("quiet");
    let inputs: Vec<String> = args
        .get_many::<String>("INPUT")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let options = TickOptions {
        tick_hz: args.get_one::<u32>("tick-hz").copied().unwrap_or(60),
        stagger_ms: args.get_one::<u64>("stagger-ms").copied().unwrap_or(0),
    };
    let settings = load_settings(args)?;
    info!("starting slotmix with {} input(s)", inputs.len());

    let spec = OutputSpec::default();
    let mut channels: Vec<SharedChannel> = Vec::with_capacity(inputs.len());
    for (index, path) in inputs.iter().enumerate() {
        let asset = match AudioAsset::load(path) {
            Ok(asset) => Arc::new(asset),
            Err(err) => {
                error!("failed to load {}: {}", path, err);
                if !quiet {
                    eprintln!("failed to load {}: {}", path, err);
                }
                return Ok(1);
            }
        };
        if asset.source().sample_rate != spec.sample_rate {
            warn!(
                "{} is {} Hz but the device runs at {} Hz; it will play at the wrong speed",
                asset.name(),
                asset.source().sample_rate,
                spec.sample_rate
            );
        }
        channels.push(AudioChannel::shared(index as i32, asset));
    }
    if channels.len() > CHANNEL_MAX {
        warn!(
            "{} inputs given; at most {} play at the same time",
            channels.len(),
            CHANNEL_MAX
        );
    }

    let stats = if args.get_flag("dry-run") {
        let mut engine = MixEngine::new(QueueDevice::open(spec)?)?;
        let frames_per_tick = options.frames_per_tick(spec.sample_rate);
        let stats = drive(&mut engine, &channels, &options, |device| {
            device.consume(frames_per_tick);
        })?;
        debug!(
            "dry run device: enqueued={} consumed={} overruns={}",
            engine.device().enqueued_frames(),
            engine.device().consumed_frames(),
            engine.device().overruns()
        );
        engine.shutdown();
        stats
    } else {
        let mut engine = MixEngine::open(&settings)?;
        let tick = options.tick();
        let stats = drive(&mut engine, &channels, &options, |_| sleep(tick))?;
        engine.shutdown();
        stats
    };

    if !quiet {
        println!(
            "played {} channel(s), {} frames mixed in {} ticks",
            channels.len(),
            stats.frames_mixed,
            stats.ticks
        );
    }
    if args.get_flag("show-log") && !quiet {
        for line in logging::snapshot(&log_buffer) {
            println!("{}", line);
        }
    }

    Ok(0)
}

fn load_settings(args: &ArgMatches) -> Result<EngineSettings, Box<dyn Error>> {
    let mut settings = match args.get_one::<String>("settings") {
        Some(path) => {
            let json = fs::read_to_string(path)?;
            EngineSettings::from_json(&json)?
        }
        None => EngineSettings::default(),
    };
    if let Some(gain_db) = args.get_one::<f32>("gain-db") {
        settings = settings.with_output_gain_db(*gain_db);
    }
    Ok(settings)
}

/// Run the host loop until every channel has finished and the device has
/// played out its backlog. `wait` is called once per tick to let time pass.
fn drive<D, F>(
    engine: &mut MixEngine<D>,
    channels: &[SharedChannel],
    options: &TickOptions,
    mut wait: F,
) -> Result<RunStats, Box<dyn Error>>
where
    D: OutputDevice,
    F: FnMut(&mut D),
{
    let mut stats = RunStats::default();
    let mut active: Vec<SharedChannel> = Vec::new();
    let mut next = 0;

    while next < channels.len() || !active.is_empty() {
        while next < channels.len() && options.start_tick(next) <= stats.ticks {
            debug!("channel {} started", next);
            active.push(channels[next].clone());
            next += 1;
        }

        let list: Vec<Option<SharedChannel>> = active.iter().cloned().map(Some).collect();
        let report = engine.update_slots(&list)?;
        stats.ticks += 1;
        stats.frames_mixed += report.frames_produced as u64;

        active.retain(|channel| {
            let channel = channel.lock().unwrap();
            if channel.is_finished() {
                debug!("channel {} finished", channel.id());
            }
            !channel.is_finished()
        });
        wait(engine.device_mut());
    }

    let frames_per_tick = options.frames_per_tick(engine.spec().sample_rate);
    let max_drain_ticks = (engine.spec().frames / frames_per_tick + 2) * 4;
    let mut drain_ticks = 0;
    while engine.device().queued_frames() > 0 {
        if drain_ticks >= max_drain_ticks {
            warn!(
                "device still holds {} frame(s) after draining; giving up",
                engine.device().queued_frames()
            );
            break;
        }
        wait(engine.device_mut());
        drain_ticks += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(tick_hz: u32, stagger_ms: u64) -> TickOptions {
        TickOptions {
            tick_hz,
            stagger_ms,
        }
    }

    fn channel(id: i32, frames: usize) -> SharedChannel {
        let asset = AudioAsset::from_pcm_f32("tone", 44_100, 1, &vec![0.25; frames]).unwrap();
        AudioChannel::shared(id, Arc::new(asset))
    }

    fn queue_engine() -> MixEngine<QueueDevice> {
        MixEngine::new(QueueDevice::open(OutputSpec::default()).unwrap()).unwrap()
    }

    #[test]
    fn stagger_converts_to_ticks() {
        let options = options(60, 500);
        assert_eq!(options.start_tick(0), 0);
        assert_eq!(options.start_tick(1), 30);
        assert_eq!(options.start_tick(3), 90);
        assert_eq!(options.frames_per_tick(44_100), 735);
    }

    #[test]
    fn huge_stagger_saturates_instead_of_overflowing() {
        let options = options(1000, u64::MAX);
        assert_eq!(options.start_tick(0), 0);
        assert_eq!(options.start_tick(5), u64::MAX / 1000);
    }

    #[test]
    fn drives_until_every_channel_finishes() {
        let channels = vec![channel(0, 4_000), channel(1, 10_000)];
        let mut engine = queue_engine();
        let stats = drive(&mut engine, &channels, &options(60, 0), |device| {
            device.consume(735);
        })
        .unwrap();

        assert!(channels
            .iter()
            .all(|channel| channel.lock().unwrap().is_finished()));
        assert_eq!(engine.device().queued_frames(), 0);
        assert!(stats.frames_mixed >= 10_000);
        assert_eq!(engine.device().overruns(), 0);
    }

    #[test]
    fn more_than_eight_inputs_take_turns() {
        let channels: Vec<SharedChannel> = (0..10).map(|id| channel(id, 1_000)).collect();
        let mut engine = queue_engine();
        drive(&mut engine, &channels, &options(60, 0), |device| {
            device.consume(735);
        })
        .unwrap();
        assert!(channels
            .iter()
            .all(|channel| channel.lock().unwrap().position() == 1_000));
    }
}
