use std::process;

use ndn_ping::{
    client::{run_client, PingClient, RunOutcome},
    configuration::{client_usage, ClientConfiguration, Parser},
    face::udp::UdpFace,
    name::Name,
    process::{interrupt_token, reraise_interrupt},
};

fn usage_exit(progname: &str) -> ! {
    eprint!("{}", client_usage(progname));
    process::exit(1);
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let progname = std::env::args().next().unwrap_or_else(|| "ndnping".to_string());

    let conf = match ClientConfiguration::try_parse() {
        Ok(conf) => conf,
        Err(e) => {
            log::debug!("Command line rejected: {}", e);
            usage_exit(&progname);
        }
    };
    if let Err(e) = conf.validate() {
        log::debug!("Invalid configuration: {}", e);
        usage_exit(&progname);
    }

    let uri = conf.prefix.clone().unwrap_or_default();
    let prefix = match Name::from_uri(&uri) {
        Ok(name) => name,
        Err(e) => {
            log::debug!("{}", e);
            eprintln!("{}: bad ndn URI: {}", progname, uri);
            process::exit(1);
        }
    };
    if !conf.extra.is_empty() {
        eprintln!("{} warning: extra arguments ignored", progname);
    }

    let mut face = match UdpFace::connect(conf.face).await {
        Ok(face) => face,
        Err(e) => {
            eprintln!("Could not connect to forwarder {}: {}", conf.face, e);
            process::exit(1);
        }
    };

    let mut client = PingClient::new(conf.settings(prefix));
    let cancel = interrupt_token();

    println!("NDNPING {}", uri);

    let outcome = run_client(&mut client, &mut face, &cancel).await;
    client.statistics().report().print(conf.output_format);

    match outcome {
        Ok(RunOutcome::Completed) => {}
        Ok(RunOutcome::Interrupted) => reraise_interrupt(),
        Err(e) => {
            eprintln!("{}: {}", progname, e);
            process::exit(1);
        }
    }
}
