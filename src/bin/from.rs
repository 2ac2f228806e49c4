#[macro_use]
extern crate log;
extern crate log4rs;
extern crate nix;
extern crate pop3_from;
extern crate structopt;

use std::cmp;
use std::env;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use nix::unistd::{getuid, User};
use structopt::StructOpt;

use pop3_from::config::{AccountConfig, Security, SessionConfig};
use pop3_from::driver;
use pop3_from::errors::*;
use pop3_from::headers::DisplayMode;
use pop3_from::unixmail;

/// Report waiting mail on the post office server and in the local mail spool.
#[derive(StructOpt, Debug)]
#[structopt(name = "from")]
struct Opt {
    /// Show one line per message: sender and subject
    #[structopt(short = "r")]
    report: bool,
    /// Show the To, From, Subject and Date headers of every message
    #[structopt(short = "v")]
    verbose: bool,
    /// Only show how many messages are waiting
    #[structopt(short = "t")]
    totals: bool,
    /// Check the post office server only
    #[structopt(short = "p")]
    pop_only: bool,
    /// Check the local mail spool only
    #[structopt(short = "u")]
    unix_only: bool,
    /// Don't say so when there is no mail
    #[structopt(short = "n")]
    no_nomail: bool,
    /// Log the POP3 conversation to stderr (twice for more)
    #[structopt(short = "d", parse(from_occurrences))]
    debug: u8,
    /// Only show mail from this sender
    #[structopt(short = "s", value_name = "sender")]
    sender: Option<String>,
    /// Post office server [default: $MAILHOST]
    #[structopt(short = "h", value_name = "host")]
    host: Option<String>,
    /// Server port [default: 110, or 995 with --tls]
    #[structopt(long)]
    port: Option<u16>,
    /// Connect with TLS
    #[structopt(long)]
    tls: bool,
    /// Connect, read and write timeout in seconds
    #[structopt(long, default_value = "60")]
    timeout: u64,
    /// Whose mail to check [default: $USER]
    user: Option<String>,
}

impl Opt {
    fn mode(&self) -> DisplayMode {
        if self.totals {
            DisplayMode::Totals
        } else if self.verbose {
            DisplayMode::Verbose
        } else if self.report {
            DisplayMode::Report
        } else {
            DisplayMode::Short
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));
    let installed = match config {
        Ok(config) => log4rs::init_config(config).map(|_| ()).map_err(|e| e.to_string()),
        Err(e) => Err(e.to_string()),
    };
    if let Err(e) = installed {
        eprintln!("from: unable to initialise logging: {}", e);
    }
}

/// What the process environment contributes to a run.
#[derive(Debug)]
struct Environment {
    /// `$USER`, else `$LOGNAME`, else the password file entry of the real UID.
    login_user: Option<String>,
    mail_host: Option<String>,
    mail_pass: Option<String>,
    mail_drop: Option<PathBuf>,
}

impl Environment {
    fn from_process() -> Environment {
        Environment {
            login_user: non_empty_var("USER")
                .or_else(|| non_empty_var("LOGNAME"))
                .or_else(password_file_user),
            mail_host: non_empty_var("MAILHOST"),
            mail_pass: env::var("MAILPASS").ok(),
            mail_drop: env::var_os("MAILDROP")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
        }
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

fn password_file_user() -> Option<String> {
    match User::from_uid(getuid()) {
        Ok(Some(user)) => Some(user.name),
        Ok(None) => None,
        Err(e) => {
            debug!("Failed to look up passwd entry for UID {}: {}", getuid(), e);
            None
        }
    }
}

fn pop_error<E: Write>(e: &Error, err: &mut E) -> io::Result<()> {
    writeln!(err, "pop: {}", e)?;
    for cause in e.iter().skip(1) {
        writeln!(err, "pop:   caused by: {}", cause)?;
    }
    Ok(())
}

/// Check the local spool, then the post office, and return the exit status.
fn run<W: Write, E: Write>(
    opt: &Opt,
    environment: &Environment,
    out: &mut W,
    err: &mut E,
) -> io::Result<i32> {
    let mode = opt.mode();
    let mut config = SessionConfig::new(mode);
    if let Some(ref sender) = opt.sender {
        config = config.with_sender(sender);
    }

    let explicit_user = opt.user.is_some();
    let user = match opt
        .user
        .clone()
        .or_else(|| environment.login_user.clone())
        .filter(|u| !u.is_empty())
    {
        Some(user) => user,
        None => {
            writeln!(err, "from: user not in password file")?;
            return Ok(1);
        }
    };

    let mut check_local = !opt.pop_only;
    let mut check_pop = !opt.unix_only;

    let host = opt
        .host
        .clone()
        .filter(|h| !h.is_empty())
        .or_else(|| environment.mail_host.clone());
    if check_pop && host.is_none() {
        if explicit_user {
            writeln!(err, "from: can't find post office server for user {}.", user)?;
        } else {
            writeln!(err, "from: can't find post office server.")?;
        }
        if !check_local {
            return Ok(1);
        }
        writeln!(err, "from: Trying unix mail drop...")?;
        check_pop = false;
    }

    let mut local_found = None;
    if check_local {
        match environment
            .mail_drop
            .clone()
            .or_else(|| unixmail::spool_path(&user))
        {
            Some(path) => match unixmail::check_mail_drop(&path, &config, check_pop, out) {
                Ok(found) => local_found = Some(found),
                Err(e) => {
                    debug!("Local mail drop unavailable: {}", e);
                    if !check_pop {
                        writeln!(err, "{}.", e)?;
                    }
                    check_local = false;
                }
            },
            None => {
                debug!("No mail spool directory");
                check_local = false;
            }
        }
    }

    let mut remote_found = None;
    let mut failed = false;
    if let (true, Some(host)) = (check_pop, host) {
        let mut account = AccountConfig::new(&host, &user);
        account.security = if opt.tls { Security::SSL } else { Security::Plain };
        account.port = opt.port.unwrap_or_else(|| account.security.default_port());
        account.password = environment.mail_pass.clone();
        account.timeout = Duration::from_secs(cmp::max(opt.timeout, 1));
        if account.password.is_none() && account.auth.needs_password() {
            warn!("MAILPASS is not set, {:?} login will fail", account.auth);
        }

        let local_mail = local_found.map_or(false, |n| n > 0);
        match driver::check_pop_mail(account, &config, local_mail, out) {
            Ok(found) => remote_found = Some(found),
            Err(e) => {
                out.flush()?;
                pop_error(&e, err)?;
                if e.is_fatal() {
                    return Ok(1);
                }
                failed = true;
            }
        }
    }

    let local_empty = !check_local || local_found == Some(0);
    let remote_empty = !check_pop || remote_found == Some(0);
    if !opt.no_nomail && mode != DisplayMode::Short && local_empty && remote_empty {
        if explicit_user {
            writeln!(out, "{} doesn't have any mail waiting.", user)?;
        } else {
            writeln!(out, "You don't have any mail waiting.")?;
        }
    }
    out.flush()?;

    Ok(if failed { 1 } else { 0 })
}

fn main() {
    let opt = Opt::from_args();
    init_logging(opt.debug);
    let environment = Environment::from_process();

    let stdout = io::stdout();
    let status = match run(&opt, &environment, &mut stdout.lock(), &mut io::stderr()) {
        Ok(status) => status,
        Err(e) => {
            eprintln!("from: {}", e);
            1
        }
    };
    process::exit(status);
}
