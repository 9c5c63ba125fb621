// NapBeacon - Deep-Sleep iBeacon Firmware
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::Context;
use clap::{Parser, Subcommand};
use napbeacon_config::{
    Assertion, ButtonSchedule, DeviceSetup, RetainedSeed, Scenario, StopReason,
};
use napbeacon_core::{build, BeaconIdentity};
use napbeacon_sim::metrics::{CycleMetrics, MetricsSummary};
use napbeacon_sim::peripherals::hci::Transmission;
use napbeacon_sim::{Machine, RunOutcome};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use tracing::{error, info, warn};

const EXIT_PASS: i32 = 0;
const EXIT_ASSERT_FAIL: i32 = 1;
const EXIT_CONFIG_ERROR: i32 = 2;
const EXIT_RUNTIME_ERROR: i32 = 3;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Number of wake cycles to simulate
    #[arg(long, default_value = "10")]
    cycles: u32,

    /// Hold the diagnostic button during every wake
    #[arg(long)]
    button: bool,

    /// Boot counter found in retained memory at power-on
    #[arg(long)]
    boot_count: Option<u32>,

    /// Reset-to-main latency added on every wake
    #[arg(long, default_value = "20")]
    boot_time_ms: u64,

    /// Write a JSON snapshot of the board after the run
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Do not mirror the device serial console to stdout
    #[arg(long)]
    no_serial_stdout: bool,

    /// Enable debug logging of radio and power events
    #[arg(short, long, global = true)]
    trace: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a scenario script and check its assertions
    Test(TestArgs),
    /// Print the advertising frame for a boot counter value
    Frame(FrameArgs),
}

#[derive(clap::Args, Debug)]
struct TestArgs {
    /// Path to the scenario (YAML)
    #[arg(long)]
    script: PathBuf,

    /// Directory for result.json and junit.xml
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Write a JUnit report to this path
    #[arg(long)]
    junit: Option<PathBuf>,

    /// Do not mirror the device serial console to stdout
    #[arg(long)]
    no_serial_stdout: bool,
}

#[derive(clap::Args, Debug)]
struct FrameArgs {
    #[arg(long)]
    boot_count: u32,

    /// Print as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Logs go to stderr; stdout carries the device serial console.
    if args.trace {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_writer(std::io::stderr)
            .init();
    }

    match args.command {
        Some(Command::Test(ref test)) => process::exit(run_test(test)),
        Some(Command::Frame(ref frame)) => print_frame(frame),
        None => run_interactive(&args),
    }
}

fn run_interactive(args: &Args) -> anyhow::Result<()> {
    info!("Starting NapBeacon simulator");

    let setup = DeviceSetup {
        boot_time_ms: args.boot_time_ms,
        retained: args.boot_count.map(|boot_count| RetainedSeed {
            boot_count,
            last_wake_ms: 0,
        }),
        button: ButtonSchedule {
            always_pressed: args.button,
            pressed_cycles: Vec::new(),
        },
        ..DeviceSetup::default()
    };
    let mut machine = Machine::from_setup(&setup, !args.no_serial_stdout);
    machine.gpio.set_button(args.button);
    let metrics = Arc::new(CycleMetrics::new());
    machine.observers.push(metrics.clone());

    info!("Running for {} cycles...", args.cycles);
    for cycle in 0..args.cycles {
        match machine.step() {
            Ok(report) => {
                if let Some(tx) = machine.controller.transmissions().last() {
                    info!(
                        "cycle {}: boot_count={} frame={}",
                        cycle,
                        report.persisted.boot_count,
                        hex(&tx.data)
                    );
                } else {
                    warn!("cycle {}: nothing transmitted", cycle);
                }
            }
            Err(e) => {
                info!("Simulation stopped at cycle {}: {}", cycle, e);
                break;
            }
        }
    }

    info!(
        "Finished: {} cycles, boot_count={}",
        machine.cycles(),
        machine.rtc.state().boot_count
    );
    log_metrics(&metrics.summary());

    if let Some(path) = &args.snapshot {
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create snapshot at {:?}", path))?;
        serde_json::to_writer_pretty(file, &machine.snapshot())
            .context("Failed to write snapshot")?;
        info!("Snapshot written to {:?}", path);
    }

    Ok(())
}

fn log_metrics(summary: &MetricsSummary) {
    info!(
        "Metrics: {} cycles ({:.0}/s), {} diagnostic, {} radio failures, {} sleep failures, {} power offs",
        summary.cycles,
        summary.cycles_per_sec,
        summary.diagnostic_cycles,
        summary.radio_failures,
        summary.sleep_failures,
        summary.power_offs
    );
}

#[derive(Serialize)]
struct FrameReport {
    boot_count: u32,
    frame: String,
    len: usize,
    flags: Option<u8>,
    uuid: Option<String>,
    manufacturer_id: Option<u16>,
    major: Option<u16>,
    minor: Option<u16>,
}

fn print_frame(args: &FrameArgs) -> anyhow::Result<()> {
    let frame = build(args.boot_count);
    let identity = frame.identity();
    let report = FrameReport {
        boot_count: args.boot_count,
        frame: hex(frame.as_bytes()),
        len: frame.len(),
        flags: frame.flags(),
        uuid: identity.map(|id| id.proximity_uuid.hyphenated().to_string()),
        manufacturer_id: identity.map(|id| id.manufacturer_id),
        major: identity.map(|id| id.major),
        minor: identity.map(|id| id.minor),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("boot_count: {}", report.boot_count);
    println!("frame ({} bytes): {}", report.len, report.frame);
    if let Some(id) = identity {
        println!("uuid: {}", id.proximity_uuid.hyphenated());
        println!("manufacturer: {:#06x}", id.manufacturer_id);
        println!("major: {}", id.major);
        println!("minor: {}", id.minor);
    }
    Ok(())
}

fn hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

#[derive(Serialize)]
struct AssertionResult {
    assertion: Assertion,
    passed: bool,
}

#[derive(Serialize)]
struct ScenarioConfig {
    script: String,
    cycles: u32,
    boot_time_ms: u64,
}

#[derive(Serialize)]
struct TestResult {
    status: &'static str,
    stop_reason: StopReason,
    cycles_run: u32,
    final_boot_count: u32,
    transmissions: usize,
    last_identity: Option<BeaconIdentity>,
    scenario_hash: String,
    config: ScenarioConfig,
    metrics: MetricsSummary,
    assertions: Vec<AssertionResult>,
}

fn run_test(args: &TestArgs) -> i32 {
    let bytes = match std::fs::read(&args.script) {
        Ok(b) => b,
        Err(e) => {
            error!("Failed to read scenario {:?}: {}", args.script, e);
            return EXIT_CONFIG_ERROR;
        }
    };
    let scenario = match std::str::from_utf8(&bytes)
        .map_err(anyhow::Error::from)
        .and_then(Scenario::from_yaml)
    {
        Ok(s) => s,
        Err(e) => {
            error!("Invalid scenario {:?}: {:#}", args.script, e);
            return EXIT_CONFIG_ERROR;
        }
    };
    let scenario_hash = format!("{:x}", Sha256::digest(&bytes));

    info!("Running scenario {:?}", args.script);
    let mut machine = Machine::from_setup(&scenario.device, !args.no_serial_stdout);
    let metrics = Arc::new(CycleMetrics::new());
    machine.observers.push(metrics.clone());
    let outcome = match machine.run_scenario(&scenario) {
        Ok(o) => o,
        Err(e) => {
            error!("Simulation failed: {}", e);
            return EXIT_RUNTIME_ERROR;
        }
    };

    let assertions: Vec<AssertionResult> = scenario
        .assertions
        .iter()
        .map(|a| AssertionResult {
            passed: evaluate(a, &machine, &outcome),
            assertion: a.clone(),
        })
        .collect();
    for result in assertions.iter().filter(|r| !r.passed) {
        warn!("Assertion failed: {:?}", result.assertion);
    }
    let passed = assertions.iter().all(|r| r.passed);

    let result = TestResult {
        status: if passed { "pass" } else { "fail" },
        stop_reason: outcome.stop_reason,
        cycles_run: outcome.cycles_run,
        final_boot_count: machine.rtc.state().boot_count,
        transmissions: machine.controller.transmissions().len(),
        last_identity: last_identity(machine.controller.transmissions()),
        scenario_hash,
        config: ScenarioConfig {
            script: args.script.display().to_string(),
            cycles: scenario.limits.cycles,
            boot_time_ms: scenario.device.boot_time_ms,
        },
        metrics: metrics.summary(),
        assertions,
    };

    if let Err(e) = write_artifacts(args, &result) {
        error!("{:#}", e);
        return EXIT_RUNTIME_ERROR;
    }

    info!(
        "Scenario {}: stop_reason={:?}, cycles={}",
        result.status, result.stop_reason, result.cycles_run
    );
    log_metrics(&result.metrics);
    if passed {
        EXIT_PASS
    } else {
        EXIT_ASSERT_FAIL
    }
}

fn last_identity(transmissions: &[Transmission]) -> Option<BeaconIdentity> {
    transmissions.last().and_then(Transmission::identity)
}

fn evaluate(assertion: &Assertion, machine: &Machine, outcome: &RunOutcome) -> bool {
    match assertion {
        Assertion::SerialContains(a) => machine.uart.output().contains(&a.serial_contains),
        Assertion::FinalBootCount(a) => machine.rtc.state().boot_count == a.final_boot_count,
        Assertion::LastFrame(a) => last_identity(machine.controller.transmissions())
            .is_some_and(|id| id.major == a.last_frame.major && id.minor == a.last_frame.minor),
        Assertion::ExpectedStopReason(a) => outcome.stop_reason == a.expected_stop_reason,
    }
}

fn write_artifacts(args: &TestArgs, result: &TestResult) -> anyhow::Result<()> {
    let junit = junit_xml(result);

    if let Some(dir) = &args.output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output dir {:?}", dir))?;
        let json = serde_json::to_string_pretty(result)?;
        write_file(&dir.join("result.json"), &json)?;
        write_file(&dir.join("junit.xml"), &junit)?;
    }
    if let Some(path) = &args.junit {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {:?}", parent))?;
        }
        write_file(path, &junit)?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {:?}", path))
}

fn junit_xml(result: &TestResult) -> String {
    let failures = result.assertions.iter().filter(|a| !a.passed).count();
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let _ = writeln!(
        xml,
        "<testsuite name=\"napbeacon test\" tests=\"{}\" failures=\"{}\">",
        result.assertions.len() + 1,
        failures
    );
    let _ = writeln!(
        xml,
        "  <testcase name=\"run\" classname=\"{}\">\n    <system-out>stop_reason={:?} cycles={}</system-out>\n  </testcase>",
        xml_escape(&result.config.script),
        result.stop_reason,
        result.cycles_run
    );
    for (i, a) in result.assertions.iter().enumerate() {
        let name = xml_escape(&format!("assertion {}: {:?}", i, a.assertion));
        if a.passed {
            let _ = writeln!(xml, "  <testcase name=\"{}\"/>", name);
        } else {
            let _ = writeln!(
                xml,
                "  <testcase name=\"{}\">\n    <failure message=\"assertion failed\"/>\n  </testcase>",
                name
            );
        }
    }
    xml.push_str("</testsuite>\n");
    xml
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
