/*-
 * #%L
 * vaucat
 * %%
 * (C) tech@Spree GmbH, 2026, licensed for gematik GmbH
 * %%
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 *
 * *******
 *
 * For additional notes and disclaimer from gematik and in case of changes by gematik find details in the "Readme" file.
 * #L%
 */

use std::io::Write;

use anyhow::{Context, Result, bail};
use argp::{FromArgs, parse_args_or_exit};
use erp_vau::client::{HttpRepository, VauClient};
use erp_vau::conf::{ClientConfig, TruststoreConfig};
use http::header::AUTHORIZATION;
use http::{Method, Request};
use openssl::bn::BigNumContext;
use openssl::ec::PointConversionForm;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vau::CryptoConfig;

#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand)]
enum Subcommand {
    Truststore(Truststore),
    Request(SendRequest),
}

/// cli args
#[derive(Debug, FromArgs)]
struct Args {
    /// VAU base url, e.g. https://erp-test.example/ (env: VAUCAT_BASE_URL)
    #[argp(option, short = 'u')]
    base_url: Option<String>,

    /// DER trust anchor, a GEM.RCA certificate (env: VAUCAT_TRUST_ANCHOR)
    #[argp(option, short = 't')]
    trust_anchor: Option<String>,

    /// client or truststore option as name=value, e.g. http_client_timeout=30 or
    /// ocsp_response_max_age=3600
    #[argp(option, short = 'o')]
    option: Vec<String>,

    /// accept invalid certs
    #[argp(switch, short = 'k')]
    insecure: bool,

    #[argp(subcommand)]
    command: Subcommand,
}

fn arg_or_env(arg: &Option<String>, var: &str, flag: &str) -> Result<String> {
    match arg {
        Some(value) => Ok(value.clone()),
        None => std::env::var(var).with_context(|| format!("require {flag} or {var}")),
    }
}

impl Args {
    async fn configs(&self) -> Result<(ClientConfig, TruststoreConfig)> {
        let mut client = ClientConfig::default();
        client.set("base_url", &arg_or_env(&self.base_url, "VAUCAT_BASE_URL", "-u")?)?;
        client.http_client_accept_invalid_certs = self.insecure;

        let anchor = arg_or_env(&self.trust_anchor, "VAUCAT_TRUST_ANCHOR", "-t")?;
        let der = tokio::fs::read(&anchor)
            .await
            .with_context(|| format!("reading trust anchor {anchor}"))?;
        let mut truststore = TruststoreConfig::new(&der)?;

        for option in &self.option {
            let Some((name, value)) = option.split_once('=') else {
                bail!("option `{option}` is not of the form name=value");
            };
            let (name, value) = (name.trim(), value.trim());
            if name == "base_url" || name.starts_with("http_client_") {
                client.set(name, value)?;
            } else {
                truststore.set(name, value)?;
            }
            debug!("vaucat: {name} = {value}");
        }
        client.validate()?;
        truststore.validate()?;
        Ok((client, truststore))
    }
}

/// load and validate the truststore, print VAU key and IDP certificates
#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand, name = "truststore")]
struct Truststore {}

/// send one inner request through the VAU channel, print the decrypted response
#[derive(FromArgs, PartialEq, Debug)]
#[argp(subcommand, name = "request")]
struct SendRequest {
    /// bearer token (env: VAUCAT_BEARER)
    #[argp(option, short = 'b')]
    bearer: Option<String>,

    /// header of the inner request as `name: value`
    #[argp(option, short = 'H')]
    header: Vec<String>,

    /// file holding the inner request body
    #[argp(option, short = 'd')]
    data: Option<String>,

    /// inner request method, e.g. GET
    #[argp(positional)]
    method: String,

    /// path below the base url, e.g. Task/160.000.000.000.000.01
    #[argp(positional)]
    path: String,
}

async fn truststore(client: &VauClient<HttpRepository>) -> Result<()> {
    let store = client.truststore().trusted().await?;

    let mut ctx = BigNumContext::new()?;
    let key = store.vau_public_key.public_key().to_bytes(
        store.vau_public_key.group(),
        PointConversionForm::UNCOMPRESSED,
        &mut ctx,
    )?;
    println!("VAU certificate: {}", store.vau_certificate.subject());
    println!("VAU public key:  {}", vau::to_hex(&key));
    for cert in &store.idp_certificates {
        println!("IDP certificate: {}", cert.subject());
    }
    for cert in &store.ca_certificates {
        println!("CA certificate:  {}", cert.subject());
    }
    for response in &store.ocsp_responses {
        println!("OCSP response produced at {}", response.produced_at());
    }
    Ok(())
}

async fn request(client: &VauClient<HttpRepository>, cmd: &SendRequest) -> Result<()> {
    let bearer = arg_or_env(&cmd.bearer, "VAUCAT_BEARER", "-b")?;
    // a leading slash would replace the path of the base url
    let url = client.base_url().join(cmd.path.trim_start_matches('/'))?;
    let mut builder = Request::builder()
        .method(Method::from_bytes(cmd.method.as_bytes())?)
        .uri(url.as_str())
        .header(AUTHORIZATION, format!("Bearer {bearer}"));
    for header in &cmd.header {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header `{header}` is not of the form name: value"))?;
        builder = builder.header(name.trim(), value.trim());
    }
    let body = match &cmd.data {
        Some(path) => tokio::fs::read(path)
            .await
            .with_context(|| format!("reading {path}"))?,
        None => vec![],
    };

    let response = client.send(builder.body(body)?).await?;
    println!("{:?} {}", response.version(), response.status());
    for (name, value) in response.headers() {
        println!("{name}: {}", value.to_str().unwrap_or("<binary>"));
    }
    println!();
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(response.body())?;
    stdout.flush()?;
    debug!(userpseudonym = %client.userpseudonym(), "vaucat: done");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Args = parse_args_or_exit(argp::DEFAULT);
    let (conf, truststore_conf) = args.configs().await?;
    let client = VauClient::connect(&conf, truststore_conf, CryptoConfig::default())?;
    match &args.command {
        Subcommand::Truststore(_) => truststore(&client).await,
        Subcommand::Request(cmd) => request(&client, cmd).await,
    }
}
