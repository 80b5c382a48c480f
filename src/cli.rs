use clap::{ArgAction, Parser};

use rdate::core::{Config, Transport, DEFAULT_TIMEOUT_SECS};
use rdate::protocol::DEFAULT_SERVICE;
use rdate::ClockAction;

#[derive(Parser, Debug)]
#[command(name = "rdate", version)]
#[command(about = "Get the time from remote hosts using the RFC 868 Time Protocol.")]
pub struct CommandLine {
    /// Set the local clock from the first host that answers
    #[arg(short = 's')]
    pub set: bool,

    /// Print the time of every host (default unless -s is given)
    #[arg(short = 'p')]
    pub print: bool,

    /// Use UDP instead of TCP
    #[arg(short = 'u')]
    pub udp: bool,

    /// Also log to syslog
    #[arg(short = 'l')]
    pub syslog: bool,

    /// Per-attempt timeout in seconds, 0 waits indefinitely
    #[arg(short = 't', value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Service name or port to contact
    #[arg(short = 'n', value_name = "SERVICE", default_value = DEFAULT_SERVICE)]
    pub service: String,

    /// With -s, slew the clock gradually instead of stepping it
    #[arg(short = 'a')]
    pub adjust: bool,

    /// More diagnostics on stderr (repeat for more)
    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    /// Hosts to query, in order
    #[arg(value_name = "HOST", required = true)]
    pub hosts: Vec<String>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Run configuration for the time client
    pub fn config(&self) -> Config {
        Config {
            transport: if self.udp {
                Transport::Datagram
            } else {
                Transport::Stream
            },
            timeout_secs: self.timeout,
            service: self.service.clone(),
        }
    }

    /// What to do with the first successful time, if anything
    pub fn clock_action(&self) -> Option<ClockAction> {
        match (self.set, self.adjust) {
            (false, _) => None,
            (true, false) => Some(ClockAction::Set),
            (true, true) => Some(ClockAction::Adjust),
        }
    }

    /// Whether reports go to stdout
    pub fn print_mode(&self) -> bool {
        self.print || !self.set
    }
}
