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

use std::collections::VecDeque;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use erp_vau::conf::TruststoreConfig;
use erp_vau::trust::{
    Certificate, Timestamp, TrustError, UntrustedCertList, UntrustedOcspList, UntrustedRepository,
};

pub mod fake_vau;

/// producedAt of the fixture OCSP responses
pub const TS: Timestamp = 1621232581;

pub fn fixture(name: &str) -> Vec<u8> {
    let path = format!("{}/tests/fixtures/{name}", env!("CARGO_MANIFEST_DIR"));
    std::fs::read(&path).unwrap_or_else(|e| panic!("{path}: {e}"))
}

pub fn cert(name: &str) -> Certificate {
    Certificate::from_der(&fixture(&format!("{name}.der"))).expect("fixture certificate")
}

pub fn cert_list() -> UntrustedCertList {
    serde_json::from_slice(&fixture("cert_list.json")).expect("cert_list.json")
}

pub fn ocsp_list() -> UntrustedOcspList {
    serde_json::from_slice(&fixture("ocsp_list.json")).expect("ocsp_list.json")
}

pub fn truststore_config() -> TruststoreConfig {
    TruststoreConfig::new(&fixture("rca3.der")).expect("rca3 as trust anchor")
}

/// Settable time source for [`erp_vau::trust::Truststore::with_time_source`].
#[derive(Clone)]
pub struct Clock(Arc<AtomicI64>);

impl Clock {
    pub fn at(timestamp: Timestamp) -> Self {
        Clock(Arc::new(AtomicI64::new(timestamp)))
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.0.store(timestamp, Ordering::SeqCst);
    }

    pub fn source(&self) -> impl Fn() -> Timestamp + Send + Sync + 'static {
        let now = self.0.clone();
        move || now.load(Ordering::SeqCst)
    }
}

/// Serves the fixture lists, or queued lists first, and counts loads and invalidations.
#[derive(Default)]
pub struct FakeRepository {
    queued: Mutex<VecDeque<(UntrustedCertList, UntrustedOcspList)>>,
    loads: AtomicUsize,
    invalidations: AtomicUsize,
}

impl FakeRepository {
    /// Answers the first load with empty lists.
    pub fn empty_first() -> Self {
        let repository = FakeRepository::default();
        repository.enqueue(UntrustedCertList::default(), UntrustedOcspList::default());
        repository
    }

    pub fn enqueue(&self, cert_list: UntrustedCertList, ocsp_list: UntrustedOcspList) {
        self.queued
            .lock()
            .expect("queue")
            .push_back((cert_list, ocsp_list));
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn invalidations(&self) -> usize {
        self.invalidations.load(Ordering::SeqCst)
    }
}

impl UntrustedRepository for FakeRepository {
    async fn load(&self) -> Result<(UntrustedCertList, UntrustedOcspList), TrustError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        let queued = self.queued.lock().expect("queue").pop_front();
        Ok(queued.unwrap_or_else(|| (cert_list(), ocsp_list())))
    }

    fn invalidate(&self) {
        self.invalidations.fetch_add(1, Ordering::SeqCst);
    }
}
