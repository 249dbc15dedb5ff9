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

use std::time::Duration;

use erp_vau::trust::{TrustError, TrustedTruststore, Truststore, UntrustedCertList};
use vau::public_key_from_certificate;

mod common;

use common::{Clock, FakeRepository, TS, cert, cert_list, fixture, ocsp_list, truststore_config};

const DAY: i64 = 86400;
const MAX_AGE: Duration = Duration::from_secs(12 * 3600);

fn create(timestamp: i64) -> Result<TrustedTruststore, TrustError> {
    TrustedTruststore::create(&ocsp_list(), &cert_list(), &truststore_config(), timestamp)
}

#[test]
fn it_creates_a_truststore_from_the_lists() {
    let store = create(TS).unwrap();
    assert_eq!(store.vau_certificate, cert("vau"));
    assert!(store.idp_certificates.contains(&cert("idp1")));
    assert!(store.idp_certificates.contains(&cert("idp2")));
    assert!(!store.idp_certificates.contains(&cert("idp3")));
    assert!(store.ca_certificates.contains(&cert("ca10")));
    assert!(!store.ocsp_responses.is_empty());

    let expected = public_key_from_certificate(&fixture("vau.der")).unwrap();
    assert_eq!(
        store.vau_public_key.public_key_to_der().unwrap(),
        expected.public_key_to_der().unwrap()
    );
}

#[test]
fn it_ages_out_with_the_ocsp_responses() {
    let store = create(TS).unwrap();
    assert_eq!(store.check_validity(MAX_AGE, TS + 3600), Ok(()));
    assert!(matches!(
        store.check_validity(MAX_AGE, TS + DAY),
        Err(TrustError::OcspNotFresh(_))
    ));
    // nothing is valid before it was produced
    assert!(store.check_validity(MAX_AGE, TS - DAY).is_err());
}

#[test]
fn it_needs_certificates_to_build_chains() {
    let result = TrustedTruststore::create(
        &ocsp_list(),
        &UntrustedCertList::default(),
        &truststore_config(),
        TS,
    );
    assert_eq!(result.err(), Some(TrustError::NoChains));
}

#[test]
fn it_needs_a_fresh_ocsp_response() {
    assert!(create(TS + DAY).is_err());
}

#[tokio::test]
async fn it_reuses_a_valid_truststore() {
    let store = Truststore::new(truststore_config(), FakeRepository::default())
        .with_time_source(Clock::at(TS + 7200).source());

    store.with_valid_vau_public_key(|_| ()).await.unwrap();
    store.with_valid_vau_public_key(|_| ()).await.unwrap();
    store.trusted().await.unwrap();

    assert_eq!(store.repository().loads(), 1);
    assert_eq!(store.repository().invalidations(), 0);
}

#[tokio::test]
async fn it_rebuilds_an_outdated_truststore() {
    let clock = Clock::at(TS + 7200);
    let store = Truststore::new(truststore_config(), FakeRepository::default())
        .with_time_source(clock.source());
    store.trusted().await.unwrap();

    // the fixture responses are stale by then, the rebuild fails and the cache is dropped
    clock.set(TS + DAY);
    assert!(store.with_valid_vau_public_key(|_| ()).await.is_err());
    assert_eq!(store.repository().loads(), 2);
    assert_eq!(store.repository().invalidations(), 2);

    clock.set(TS + 3600);
    store.with_valid_vau_public_key(|_| ()).await.unwrap();
    assert_eq!(store.repository().loads(), 3);
}

#[tokio::test]
async fn it_retries_a_failed_first_build_once() {
    let store = Truststore::new(truststore_config(), FakeRepository::empty_first())
        .with_time_source(Clock::at(TS + 7200).source());

    let trusted = store.trusted().await.unwrap();
    assert_eq!(trusted.vau_certificate, cert("vau"));
    assert_eq!(store.repository().loads(), 2);
    assert_eq!(store.repository().invalidations(), 1);
}

#[tokio::test]
async fn it_gives_up_after_the_retry() {
    let repository = FakeRepository::empty_first();
    repository.enqueue(UntrustedCertList::default(), Default::default());
    let store = Truststore::new(truststore_config(), repository)
        .with_time_source(Clock::at(TS + 7200).source());

    assert_eq!(store.trusted().await.err(), Some(TrustError::NoChains));
    assert_eq!(store.repository().loads(), 2);
    // once before the retry, once for the final failure
    assert_eq!(store.repository().invalidations(), 2);
}

#[tokio::test]
async fn it_checks_idp_certificates() {
    let store = Truststore::new(truststore_config(), FakeRepository::default())
        .with_time_source(Clock::at(TS + 7200).source());

    store.check_idp_certificate(&cert("idp1"), true).await.unwrap();
    store.check_idp_certificate(&cert("idp4"), true).await.unwrap();

    // unknown, but the cached store survives
    assert_eq!(
        store.check_idp_certificate(&cert("idp3"), false).await,
        Err(TrustError::UnknownIdpCertificate)
    );
    assert_eq!(store.repository().loads(), 1);
    assert_eq!(store.repository().invalidations(), 0);

    // unknown, and the store is dropped
    assert_eq!(
        store.check_idp_certificate(&cert("idp3"), true).await,
        Err(TrustError::UnknownIdpCertificate)
    );
    assert_eq!(store.repository().invalidations(), 1);
    store.check_idp_certificate(&cert("idp2"), true).await.unwrap();
    assert_eq!(store.repository().loads(), 2);
}
