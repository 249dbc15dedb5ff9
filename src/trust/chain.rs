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

//! Certificate chains, leaf first.

use tracing::debug;

use super::ocsp::CertStatus;
use super::{Certificate, OcspResponse, Timestamp, TrustError};

pub type Chain = Vec<Certificate>;

/// A chain holds when it has at least three certificates, each valid at `timestamp` and each
/// but the last signed by its successor.
pub fn check_chain(chain: &[Certificate], timestamp: Timestamp) -> Result<(), TrustError> {
    if chain.len() < 3 {
        return Err(TrustError::ChainTooShort(chain.len()));
    }
    chain[chain.len() - 1].check_validity(timestamp)?;
    // root to leaf
    for pair in chain.windows(2).rev() {
        pair[0].can_be_validated_by(&pair[1], timestamp)?;
    }
    Ok(())
}

/// Splits `chains` into those passing [`check_chain`] and those failing, the latter with the
/// reason.
pub fn partition_by_signature(
    chains: &[Chain],
    timestamp: Timestamp,
) -> (Vec<Chain>, Vec<(Chain, TrustError)>) {
    let mut valid = vec![];
    let mut rejected = vec![];
    for chain in chains {
        match check_chain(chain, timestamp) {
            Ok(()) => valid.push(chain.clone()),
            Err(e) => rejected.push((chain.clone(), e)),
        }
    }
    (valid, rejected)
}

pub fn filter_by_signature(chains: &[Chain], timestamp: Timestamp) -> Vec<Chain> {
    let (valid, rejected) = partition_by_signature(chains, timestamp);
    for (chain, reason) in &rejected {
        debug!(
            leaf = chain.first().map(Certificate::subject).unwrap_or_default(),
            "trust: dropping chain: {reason}"
        );
    }
    valid
}

/// Keeps the chains whose leaf carries `oid` and is covered by a good OCSP status in one of
/// `responses`, issued for the leaf by the second certificate of the chain.
pub fn filter_by_oid_and_ocsp_response(
    chains: &[Chain],
    oid: &[u8],
    responses: &[OcspResponse],
    timestamp: Timestamp,
) -> Vec<Chain> {
    filter_by_oid_and_ocsp_response_with(chains, oid, responses, timestamp, false)
}

/// As [`filter_by_oid_and_ocsp_response`]; with `require_cert_hash` the matching OCSP entry must
/// also carry a `CertHash` of the leaf.
pub fn filter_by_oid_and_ocsp_response_with(
    chains: &[Chain],
    oid: &[u8],
    responses: &[OcspResponse],
    timestamp: Timestamp,
    require_cert_hash: bool,
) -> Vec<Chain> {
    chains
        .iter()
        .filter(|chain| {
            let (Some(leaf), Some(issuer)) = (chain.first(), chain.get(1)) else {
                return false;
            };
            if !leaf.contains_oid(oid) {
                return false;
            }
            let covered = responses
                .iter()
                .filter(|response| response.produced_at() <= timestamp)
                .flat_map(|response| response.responses())
                .any(|single| {
                    single.this_update() <= timestamp
                        && single.status() == CertStatus::Good
                        && single.matches(leaf, issuer)
                        && (!require_cert_hash || single.matches_hash_of_certificate(leaf).is_ok())
                });
            if !covered {
                debug!(leaf = leaf.subject(), "trust: no matching ocsp response");
            }
            covered
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: Timestamp = 1621232581;

    fn cert(name: &str) -> Certificate {
        let path = format!("{}/tests/fixtures/{name}.der", env!("CARGO_MANIFEST_DIR"));
        Certificate::from_der(&std::fs::read(path).unwrap()).unwrap()
    }

    fn chain(names: &[&str]) -> Chain {
        names.iter().map(|n| cert(n)).collect()
    }

    #[test]
    fn it_accepts_a_valid_chain() {
        assert_eq!(check_chain(&chain(&["vau", "ca10", "rca3"]), TS), Ok(()));
    }

    #[test]
    fn it_rejects_short_chains() {
        assert_eq!(
            check_chain(&chain(&["vau", "ca10"]), TS),
            Err(TrustError::ChainTooShort(2))
        );
        assert_eq!(check_chain(&[], TS), Err(TrustError::ChainTooShort(0)));
    }

    #[test]
    fn it_rejects_a_wrong_issuer() {
        let result = check_chain(&chain(&["vau", "ca11", "rca3"]), TS);
        assert!(matches!(result, Err(TrustError::Signature { .. })), "{result:?}");
    }

    #[test]
    fn it_rejects_a_foreign_root() {
        // vau is signed by ca10, but ca10 is not signed by ca11
        let chains = vec![chain(&["vau", "ca10", "ca11"])];
        assert_eq!(cert("vau").can_be_validated_by(&cert("ca10"), TS), Ok(()));

        assert_eq!(
            check_chain(&chains[0], TS),
            Err(TrustError::Signature {
                subject: cert("ca10").subject().to_string(),
                issuer: cert("ca11").subject().to_string(),
            })
        );
        let (valid, rejected) = partition_by_signature(&chains, TS);
        assert!(valid.is_empty());
        assert!(matches!(rejected[..], [(_, TrustError::Signature { .. })]));
        assert!(filter_by_signature(&chains, TS).is_empty());
    }

    #[test]
    fn it_rejects_expired_chains() {
        let vau = cert("vau");
        let result = check_chain(&chain(&["vau", "ca10", "rca3"]), vau.not_after() + 1);
        assert!(matches!(result, Err(TrustError::Expired { .. })), "{result:?}");
    }

    #[test]
    fn it_partitions_with_reasons() {
        let chains = vec![
            chain(&["vau", "ca10", "rca3"]),
            chain(&["idp1", "ca11", "rca3"]),
            chain(&["idp1", "ca10"]),
        ];
        let (valid, rejected) = partition_by_signature(&chains, TS);
        assert_eq!(valid, vec![chains[0].clone()]);
        assert_eq!(rejected.len(), 2);
        assert!(matches!(rejected[0].1, TrustError::Signature { .. }));
        assert_eq!(rejected[1].1, TrustError::ChainTooShort(2));

        assert_eq!(filter_by_signature(&chains, TS), valid);
    }

    #[test]
    fn it_filters_by_oid_and_ocsp() {
        let vau_oid = [6, 8, 42, 130, 20, 0, 76, 4, 130, 2];
        let ocsp3 = OcspResponse::from_der(
            &std::fs::read(format!("{}/tests/fixtures/ocsp3.der", env!("CARGO_MANIFEST_DIR")))
                .unwrap(),
        )
        .unwrap();
        let chains = vec![
            chain(&["vau", "ca10", "rca3"]),
            chain(&["idp1", "ca10", "rca3"]),
        ];

        let found = filter_by_oid_and_ocsp_response(&chains, &vau_oid, &[ocsp3.clone()], TS);
        assert_eq!(found, vec![chains[0].clone()]);

        // produced after the reference time
        let early = filter_by_oid_and_ocsp_response(&chains, &vau_oid, &[ocsp3.clone()], TS - 10);
        assert!(early.is_empty());

        assert!(filter_by_oid_and_ocsp_response(&chains, &vau_oid, &[], TS).is_empty());

        let strict =
            filter_by_oid_and_ocsp_response_with(&chains, &vau_oid, &[ocsp3], TS, true);
        assert!(strict.is_empty());
    }
}
