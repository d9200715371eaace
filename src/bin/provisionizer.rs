// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line client for the provisioning server.
//!
//! ```bash
//! provisionizer provision web-01 --template debian-web \
//!     --fqdn web-01.example.com --ipv4 192.0.2.10 --ipv4-prefix-length 24
//! provisionizer deprovision web-01 --fqdn web-01.example.com --ipv4 192.0.2.10
//! ```
//!
//! Exits with status 1 if any step reports a failure.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use provisionize::client::{print_event, ProvisionClient};
use provisionize::types::{IpConfig, Operation, ProvisionRequest, VirtualMachineSpec};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "provisionizer", version, about = "Provision and deprovision virtual machines")]
struct Cli {
    /// Provisioning server endpoint
    #[arg(long, global = true, default_value = "http://localhost:1337")]
    api: String,

    /// Print diagnostic payloads attached to events
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a virtual machine and everything it needs
    Provision(VmArgs),
    /// Remove a virtual machine and its records
    Deprovision(VmArgs),
}

#[derive(Debug, Args)]
struct VmArgs {
    /// VM name
    name: String,

    /// Identifier carried through to logs
    #[arg(long, default_value = "")]
    request_id: String,

    #[arg(long, default_value = "")]
    id: String,

    #[arg(long, default_value = "")]
    cluster: String,

    #[arg(long, default_value = "")]
    template: String,

    #[arg(long)]
    fqdn: Option<String>,

    #[arg(long, default_value_t = 4)]
    cores: u32,

    /// Memory in MB
    #[arg(long, default_value_t = 1024)]
    memory: u32,

    #[arg(long)]
    ipv4: Option<Ipv4Addr>,

    #[arg(long, default_value_t = 24)]
    ipv4_prefix_length: u8,

    #[arg(long)]
    ipv4_gateway: Option<Ipv4Addr>,

    #[arg(long)]
    ipv6: Option<Ipv6Addr>,

    #[arg(long, default_value_t = 64)]
    ipv6_prefix_length: u8,

    #[arg(long)]
    ipv6_gateway: Option<Ipv6Addr>,
}

impl VmArgs {
    fn into_request(self) -> Result<ProvisionRequest> {
        if self.ipv4_prefix_length > 32 {
            bail!("--ipv4-prefix-length must be at most 32");
        }
        if self.ipv6_prefix_length > 128 {
            bail!("--ipv6-prefix-length must be at most 128");
        }

        let ipv4 = self.ipv4.map(|address| IpConfig {
            address: IpAddr::V4(address),
            prefix_length: self.ipv4_prefix_length,
            gateway: self.ipv4_gateway.map(IpAddr::V4),
        });
        let ipv6 = self.ipv6.map(|address| IpConfig {
            address: IpAddr::V6(address),
            prefix_length: self.ipv6_prefix_length,
            gateway: self.ipv6_gateway.map(IpAddr::V6),
        });

        Ok(ProvisionRequest {
            request_id: self.request_id,
            virtual_machine: VirtualMachineSpec {
                id: self.id,
                name: self.name,
                cluster_name: self.cluster,
                template: self.template,
                cores: self.cores,
                memory_mb: self.memory,
                fqdn: self.fqdn,
                ipv4,
                ipv6,
            },
        })
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let (operation, args) = match cli.command {
        Command::Provision(args) => (Operation::Provision, args),
        Command::Deprovision(args) => (Operation::Deprovision, args),
    };
    let request = args.into_request()?;

    let client = ProvisionClient::new(&cli.api);
    let mut stdout = std::io::stdout();
    let summary = client
        .run(operation, &request, |event| {
            print_event(&mut stdout, event, cli.debug);
        })
        .await?;

    Ok(summary.succeeded())
}
