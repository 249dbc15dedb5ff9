/*-
 * #%L
 * erp_vau
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

use std::sync::Arc;

use erp_vau::client::{
    ClientError, HttpRepository, INITIAL_USERPSEUDONYM, VauClient, build_http_client,
};
use erp_vau::conf::ClientConfig;
use erp_vau::trust::{TrustedTruststore, Truststore, UntrustedRepository};
use erp_vau::vau::HttpError;
use http::header::AUTHORIZATION;
use http::{Method, Request, StatusCode};
use reqwest::Client;
use vau::{CryptoConfig, VauPublicKey, generate_key_pair, public_key_of};

mod common;

use common::fake_vau::{self, FakeVau};
use common::{TS, cert_list, ocsp_list, truststore_config};

// loopback must not go through a proxy from the environment
fn http_client() -> Client {
    Client::builder().no_proxy().build().unwrap()
}

/// A client whose truststore validates the fixtures but encrypts to `vau_key`; the fixture VAU
/// certificate has no private key at hand.
fn client(server: &FakeVau, vau_key: VauPublicKey) -> VauClient<HttpRepository> {
    let http = http_client();
    let repository = HttpRepository::new(http.clone(), server.base_url());
    let truststore = Truststore::new(truststore_config(), repository)
        .with_time_source(|| TS + 7200)
        .with_factory(move |ocsp_list, cert_list, conf, timestamp| {
            let mut store = TrustedTruststore::create(ocsp_list, cert_list, conf, timestamp)?;
            store.vau_public_key = vau_key.clone();
            Ok(store)
        });
    VauClient::with_client(
        http,
        server.base_url(),
        CryptoConfig::default(),
        Arc::new(truststore),
    )
}

fn get(server: &FakeVau, path: &str, bearer: Option<&str>) -> Request<Vec<u8>> {
    let mut builder = Request::builder()
        .method(Method::GET)
        .uri(server.base_url().join(path).unwrap().as_str());
    if let Some(bearer) = bearer {
        builder = builder.header(AUTHORIZATION, format!("Bearer {bearer}"));
    }
    builder.body(vec![]).unwrap()
}

#[tokio::test]
async fn it_sends_requests_through_the_channel() {
    let server = fake_vau::start().await.unwrap();
    let client = client(&server, public_key_of(server.key()).unwrap());
    assert_eq!(client.userpseudonym(), INITIAL_USERPSEUDONYM);

    let response = client
        .send(get(&server, "Task/42", Some("token-1")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), b"GET /Task/42 token-1");
    assert_eq!(client.userpseudonym(), "pseudo-1");

    let response = client
        .send(get(&server, "Communication?received=NULL", Some("token-2")))
        .await
        .unwrap();
    assert_eq!(response.body(), b"GET /Communication?received=NULL token-2");
    assert_eq!(client.userpseudonym(), "pseudo-2");

    assert_eq!(server.pseudonyms(), vec!["0", "pseudo-1"]);
    // the validated truststore is reused
    assert_eq!(server.cert_list_hits(), 1);
}

#[tokio::test]
async fn it_reports_a_rejected_request() {
    let server = fake_vau::start().await.unwrap();
    let foreign = generate_key_pair(&CryptoConfig::default()).unwrap();
    let client = client(&server, public_key_of(&foreign).unwrap());

    let result = client.send(get(&server, "Task", Some("token"))).await;
    assert!(
        matches!(
            result,
            Err(ClientError::Http(HttpError::UnsuccessfulResponse(StatusCode::BAD_REQUEST)))
        ),
        "{result:?}"
    );
    assert_eq!(client.userpseudonym(), INITIAL_USERPSEUDONYM);
}

#[tokio::test]
async fn it_requires_a_bearer_token() {
    let server = fake_vau::start().await.unwrap();
    let client = client(&server, public_key_of(server.key()).unwrap());

    let result = client.send(get(&server, "Task", None)).await;
    assert!(
        matches!(result, Err(ClientError::Http(HttpError::MissingBearer))),
        "{result:?}"
    );
    assert!(server.pseudonyms().is_empty());
}

#[tokio::test]
async fn it_caches_the_lists_until_invalidated() {
    let server = fake_vau::start().await.unwrap();
    let repository = HttpRepository::new(http_client(), server.base_url());

    let (certs, ocsp) = repository.load().await.unwrap();
    assert_eq!(certs, cert_list());
    assert_eq!(ocsp, ocsp_list());
    repository.load().await.unwrap();
    assert_eq!(server.cert_list_hits(), 1);

    repository.invalidate();
    repository.load().await.unwrap();
    assert_eq!(server.cert_list_hits(), 2);
}

#[test]
fn it_builds_a_client_from_config() {
    let mut conf = ClientConfig::default();
    assert!(VauClient::connect(&conf, truststore_config(), CryptoConfig::default()).is_err());

    conf.set("base_url", "https://erp.example/vau-base").unwrap();
    conf.set("http_client_accept_invalid_certs", "on").unwrap();
    conf.validate().unwrap();
    assert!(build_http_client(&conf).is_ok());

    let client = VauClient::connect(&conf, truststore_config(), CryptoConfig::default()).unwrap();
    assert_eq!(client.base_url().as_str(), "https://erp.example/vau-base/");
    assert_eq!(client.userpseudonym(), INITIAL_USERPSEUDONYM);
}
