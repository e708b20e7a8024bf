//! CLI argument definitions for `slotmix`.

use clap::{value_parser, Arg, ArgAction, Command};
use slotmix_lib::level::parse_db_str;

/// Build the CLI argument parser.
pub fn build_cli() -> Command {
    Command::new("slotmix")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Mix sound files through a fixed bank of eight channels")
        .arg_required_else_help(true)
        .arg(
            Arg::new("tick-hz")
                .long("tick-hz")
                .short('t')
                .value_name("HZ")
                .default_value("60")
                .value_parser(value_parser!(u32).range(1..=1000))
                .help("Host ticks per second; one mix pass per tick"),
        )
        .arg(
            Arg::new("stagger-ms")
                .long("stagger-ms")
                .value_name("MS")
                .default_value("0")
                .value_parser(value_parser!(u64))
                .help("Delay between starting successive inputs"),
        )
        .arg(
            Arg::new("gain-db")
                .long("gain-db")
                .short('g')
                .value_name("DB")
                .allow_hyphen_values(true)
                .value_parser(parse_gain)
                .help("Output gain in dB, e.g. -6 or -6db [default: 0, or the settings file]"),
        )
        .arg(
            Arg::new("settings")
                .long("settings")
                .short('S')
                .value_name("PATH")
                .help("Path to a JSON file with engine settings"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .action(ArgAction::SetTrue)
                .help("Mix into an in-memory device on a simulated clock instead of playing"),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .action(ArgAction::SetTrue)
                .help("Suppress all console output"),
        )
        .arg(
            Arg::new("show-log")
                .long("show-log")
                .action(ArgAction::SetTrue)
                .help("Print the captured log after the run"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Sound files to play; at most eight play at the same time")
                .required(true)
                .num_args(1..)
                .index(1),
        )
}

fn parse_gain(value: &str) -> Result<f32, String> {
    parse_db_str(value).ok_or_else(|| format!("invalid gain: {}", value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_defaults() {
        let matches = build_cli()
            .try_get_matches_from(["slotmix", "a.wav", "b.wav"])
            .unwrap();
        assert_eq!(matches.get_one::<u32>("tick-hz"), Some(&60));
        assert_eq!(matches.get_one::<u64>("stagger-ms"), Some(&0));
        assert_eq!(matches.get_one::<f32>("gain-db"), None);
        assert_eq!(matches.get_many::<String>("INPUT").unwrap().count(), 2);
        assert!(!matches.get_flag("dry-run"));
    }

    #[test]
    fn accepts_negative_and_suffixed_gain() {
        let matches = build_cli()
            .try_get_matches_from(["slotmix", "--gain-db", "-6db", "a.wav"])
            .unwrap();
        assert_eq!(matches.get_one::<f32>("gain-db"), Some(&-6.0));
    }

    #[test]
    fn rejects_zero_tick_rate() {
        assert!(build_cli()
            .try_get_matches_from(["slotmix", "--tick-hz", "0", "a.wav"])
            .is_err());
    }
}
