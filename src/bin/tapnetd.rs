//! `tapnetd`: attaches to a TAP interface and answers ARP/ICMPv4-echo/TCP
//! handshake traffic addressed to a configured IPv4/MAC pair.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};

use tapnet::dispatcher::{dispatch, DispatchOutcome, DispatchState};
use tapnet::render::summarize;
use tapnet::transport::{LinuxTap, TapTransport};
use tapnet::virtio::VirtioNetHeader;
use tapnet::wire::{WireHeader, WireReader, WireWriter};

/// Userspace TAP responder: Ethernet/ARP/ICMPv4-echo/minimal-TCP.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Name requested for the TAP interface.
    #[arg(long, default_value = "tapnet0")]
    interface: String,

    /// Our IPv4 address, as four dot-separated octets.
    #[arg(long, default_value = "10.3.3.3")]
    ip: String,

    /// Our MAC address, as six colon-separated hex octets.
    #[arg(long, default_value = "aa:bb:bb:00:00:dd")]
    mac: String,

    /// Negotiate a 12-byte virtio-net header on every frame.
    #[arg(long)]
    vnet_header: bool,

    /// Stop after this many frames have been read (0 means run forever).
    #[arg(long, default_value_t = 100)]
    frame_count: u64,
}

fn parse_ipv4(s: &str) -> Result<[u8; 4]> {
    let mut out = [0u8; 4];
    let mut parts = s.split('.');
    for slot in out.iter_mut() {
        let part = parts.next().context("not enough octets in IPv4 address")?;
        *slot = part.parse().context("invalid IPv4 octet")?;
    }
    anyhow::ensure!(parts.next().is_none(), "too many octets in IPv4 address");
    Ok(out)
}

fn parse_mac(s: &str) -> Result<[u8; 6]> {
    let mut out = [0u8; 6];
    let mut parts = s.split(':');
    for slot in out.iter_mut() {
        let part = parts.next().context("not enough octets in MAC address")?;
        *slot = u8::from_str_radix(part, 16).context("invalid MAC octet")?;
    }
    anyhow::ensure!(parts.next().is_none(), "too many octets in MAC address");
    Ok(out)
}

/// Registers `SIGUSR1`/`SIGUSR2` against two independently-togglable flags:
/// "print frame summaries" and "write responses back to the TAP device".
/// Both default on. `signal_hook::flag::register` only ever sets its flag to
/// `true`, which can't express a toggle, so each signal gets its own
/// low-level handler that flips the bit with `fetch_xor` — an
/// async-signal-safe atomic op, the one thing a signal handler is allowed
/// to do without risking a deadlock or reentrancy bug.
fn install_toggles() -> Result<(Arc<AtomicBool>, Arc<AtomicBool>)> {
    let print_frames = Arc::new(AtomicBool::new(true));
    let write_responses = Arc::new(AtomicBool::new(true));

    let flag = Arc::clone(&print_frames);
    // SAFETY: the handler only performs a single async-signal-safe atomic
    // flip, nothing else.
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGUSR1, move || {
            flag.fetch_xor(true, Ordering::SeqCst);
        })
    }
    .context("failed to register SIGUSR1 handler")?;

    let flag = Arc::clone(&write_responses);
    // SAFETY: same as above.
    unsafe {
        signal_hook::low_level::register(signal_hook::consts::SIGUSR2, move || {
            flag.fetch_xor(true, Ordering::SeqCst);
        })
    }
    .context("failed to register SIGUSR2 handler")?;

    Ok((print_frames, write_responses))
}

fn run(args: &Args) -> Result<()> {
    let ip = parse_ipv4(&args.ip)?;
    let mac = parse_mac(&args.mac)?;

    let mut tap = LinuxTap::open(&args.interface, args.vnet_header)
        .with_context(|| format!("failed to open tap device {:?}", args.interface))?;
    info!(interface = tap.name(), "opened tap device");

    let (print_frames, write_responses) = install_toggles()?;

    let mut state = DispatchState::new(ip, mac);
    let mut read_buf = vec![0u8; 2000];

    let mut remaining = if args.frame_count == 0 { None } else { Some(args.frame_count) };
    loop {
        if let Some(0) = remaining {
            break;
        }

        let n = match tap.read_frame(&mut read_buf) {
            Ok(n) => n,
            Err(err) => {
                warn!(%err, "failed to read from tap device");
                continue;
            }
        };
        if let Some(r) = remaining.as_mut() {
            *r -= 1;
        }
        if n == 0 {
            continue;
        }

        let mut reader = WireReader::new(&read_buf[..n]);
        let vnet_header = if args.vnet_header {
            match VirtioNetHeader::parse(&mut reader) {
                Ok(hdr) => Some(hdr),
                Err(err) => {
                    warn!(%err, "short vnet header, dropping frame");
                    continue;
                }
            }
        } else {
            None
        };
        let ethernet_frame = reader.remaining();

        let outcome = dispatch(ethernet_frame, &mut state);
        if print_frames.load(Ordering::Relaxed) {
            info!(summary = %summarize(&outcome), "frame");
        }

        if let DispatchOutcome::Replied { response, .. } = outcome {
            if !write_responses.load(Ordering::Relaxed) {
                debug!("write-responses toggle is off, dropping response");
                continue;
            }
            let out_frame = match &vnet_header {
                Some(hdr) => {
                    let mut w = WireWriter::with_capacity(VirtioNetHeader::WIRE_SIZE + response.len());
                    hdr.write(&mut w);
                    w.bytes(&response);
                    w.into_vec()
                }
                None => response,
            };
            if let Err(err) = tap.write_frame(&out_frame) {
                warn!(%err, "failed to write response frame");
            }
        }
    }

    info!("frame budget exhausted, shutting down");
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        warn!(%err, "tapnetd exiting with error");
        eprintln!("tapnetd: {err:#}");
        std::process::exit(1);
    }
}
