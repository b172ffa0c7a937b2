use std::process;

use ndn_ping::{
    configuration::{server_usage, Parser, ServerConfiguration},
    face::udp::UdpFace,
    name::Name,
    process::{daemonize, interrupt_token},
    server::{run_server, PingServer},
};

fn usage_exit(progname: &str) -> ! {
    eprint!("{}", server_usage(progname));
    process::exit(1);
}

fn main() {
    env_logger::init();

    let progname = std::env::args()
        .next()
        .unwrap_or_else(|| "ndnpingserver".to_string());

    let conf = match ServerConfiguration::try_parse() {
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

    // Bind before detaching so failures still reach the terminal.
    let socket = match std::net::UdpSocket::bind(conf.listen) {
        Ok(socket) => socket,
        Err(e) => {
            eprintln!("Could not listen on {}: {}", conf.listen, e);
            process::exit(1);
        }
    };

    if conf.daemon {
        if let Err(e) = daemonize() {
            eprintln!("{}: daemon mode failed: {}", progname, e);
            process::exit(1);
        }
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: cannot start runtime: {}", progname, e);
            process::exit(1);
        }
    };

    let result = runtime.block_on(async {
        let mut face = UdpFace::from_std(socket)?;
        let mut server = PingServer::new(&prefix, conf.freshness_seconds());
        let cancel = interrupt_token();
        run_server(&mut server, &mut face, &cancel).await
    });

    if let Err(e) = result {
        eprintln!("{}: {}", progname, e);
        process::exit(1);
    }
}
