//! Certificate chain building and verification.
//!
//! Chains are searched depth-first from the leaf: candidate parents come
//! from the authority key identifier index (falling back to raw issuer
//! name), each candidate must produce a valid SM2-with-SM3 signature over
//! the child's raw `tbsCertificate`, and per-certificate checks (validity
//! window, CA gates, path length) run as the chain grows. Results are
//! memoized per intermediate, and a raw-bytes identity check on the current
//! chain keeps cross-signed loops from recursing forever.

use super::{system_roots, CertPool, Certificate, ExtKeyUsage, PublicKeyAlgorithm, SignatureAlgorithm};
use crate::{
    error::{Error, Result},
    sign,
};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::SystemTime;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CertificateRole {
    Leaf,
    Intermediate,
    Root,
}

/// Options controlling [`Certificate::verify`].
#[derive(Clone, Debug, Default)]
pub struct VerifyOptions<'a> {
    /// Hostname the leaf must cover; empty skips hostname checking.
    pub dns_name: String,
    /// Pool of candidate intermediates.
    pub intermediates: Option<&'a CertPool>,
    /// Trusted roots. `None` uses the system root bundle.
    pub roots: Option<&'a CertPool>,
    /// Verification time. `None` uses the current time.
    pub current_time: Option<SystemTime>,
    /// Extended key usages the chain must support. Empty requires server
    /// authentication; [`ExtKeyUsage::Any`] accepts every chain.
    pub key_usages: Vec<ExtKeyUsage>,
}

impl Certificate {
    /// Verify this certificate against the options, returning every valid
    /// chain found (leaf first, trusted root last).
    pub fn verify(&self, opts: &VerifyOptions<'_>) -> Result<Vec<Vec<Certificate>>> {
        if !self.unhandled_critical_extensions.is_empty() {
            return Err(Error::UnhandledCriticalExtension);
        }

        let roots = match opts.roots {
            Some(roots) => roots,
            None => system_roots().ok_or(Error::InvalidInput(
                "no trusted roots supplied and no system root bundle available",
            ))?,
        };

        self.is_valid(CertificateRole::Leaf, &[], opts)?;

        if !opts.dns_name.is_empty() {
            self.verify_hostname(&opts.dns_name)?;
        }

        let candidate_chains = if roots.contains(self) {
            vec![vec![self.clone()]]
        } else {
            self.build_chains(&mut HashMap::new(), &[self.clone()], roots, opts)?
        };

        let default_usage = [ExtKeyUsage::ServerAuth];
        let key_usages: &[ExtKeyUsage] = if opts.key_usages.is_empty() {
            &default_usage
        } else {
            &opts.key_usages
        };

        if key_usages.contains(&ExtKeyUsage::Any) {
            return Ok(candidate_chains);
        }

        let chains: Vec<Vec<Certificate>> = candidate_chains
            .into_iter()
            .filter(|chain| check_chain_for_key_usage(chain, key_usages))
            .collect();
        if chains.is_empty() {
            return Err(Error::IncompatibleUsage);
        }
        Ok(chains)
    }

    /// Whether this certificate covers `host` (an IP literal or DNS name).
    ///
    /// DNS matching uses the subject alternative names when any are present,
    /// falling back to the subject common name, with single-label wildcard
    /// support.
    pub fn verify_hostname(&self, host: &str) -> Result<()> {
        let candidate_ip = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = candidate_ip.parse::<IpAddr>() {
            if self.ip_addresses.contains(&ip) {
                return Ok(());
            }
            return Err(Error::HostnameMismatch(host.to_string()));
        }

        let lowered = host.to_ascii_lowercase();
        if !self.dns_names.is_empty() {
            if self
                .dns_names
                .iter()
                .any(|candidate| match_hostnames(candidate, &lowered))
            {
                return Ok(());
            }
        } else if let Some(cn) = &self.common_name {
            if match_hostnames(cn, &lowered) {
                return Ok(());
            }
        }
        Err(Error::HostnameMismatch(host.to_string()))
    }

    /// Per-certificate checks applied as the chain grows: validity window,
    /// permitted DNS domains, CA authorization, path length.
    fn is_valid(
        &self,
        role: CertificateRole,
        current_chain: &[Certificate],
        opts: &VerifyOptions<'_>,
    ) -> Result<()> {
        let now = opts.current_time.unwrap_or_else(SystemTime::now);
        if now < self.not_before || now > self.not_after {
            return Err(Error::Expired);
        }

        if !self.permitted_dns_domains.is_empty() {
            let name = opts.dns_name.as_str();
            let ok = self.permitted_dns_domains.iter().any(|domain| {
                name == domain
                    || (name.ends_with(domain.as_str())
                        && name.len() >= 1 + domain.len()
                        && name.as_bytes()[name.len() - domain.len() - 1] == b'.')
            });
            if !ok {
                return Err(Error::NameConstraintViolation);
            }
        }

        if role == CertificateRole::Intermediate && (!self.basic_constraints_valid || !self.is_ca) {
            return Err(Error::NotAuthorizedToSign);
        }

        if self.basic_constraints_valid {
            if let Some(max) = self.max_path_len {
                let num_intermediates = current_chain.len().saturating_sub(1);
                if num_intermediates > usize::from(max) {
                    return Err(Error::TooManyIntermediates);
                }
            }
        }

        Ok(())
    }

    /// Depth-first search for chains from this certificate to a trusted
    /// root. `cache` memoizes the chains reachable through each
    /// intermediate index.
    fn build_chains(
        &self,
        cache: &mut HashMap<usize, Vec<Vec<Certificate>>>,
        current_chain: &[Certificate],
        roots: &CertPool,
        opts: &VerifyOptions<'_>,
    ) -> Result<Vec<Vec<Certificate>>> {
        let mut chains: Vec<Vec<Certificate>> = Vec::new();
        let mut last_err: Option<Error> = None;

        let (possible_roots, root_hint) = roots.find_verified_parents(self);
        for root_index in possible_roots {
            let root = roots.cert(root_index);
            match root.is_valid(CertificateRole::Root, current_chain, opts) {
                Ok(()) => chains.push(append_to_fresh_chain(current_chain, root)),
                Err(err) => {
                    log::debug!("rejecting candidate root {root}: {err}");
                    last_err = Some(err);
                }
            }
        }

        let mut intermediate_hint: Option<(Certificate, Error)> = None;
        if let Some(pool) = opts.intermediates {
            let (candidates, hint) = pool.find_verified_parents(self);
            intermediate_hint = hint.map(|(i, err)| (pool.cert(i).clone(), err));

            'next_intermediate: for index in candidates {
                let intermediate = pool.cert(index);
                for cert in current_chain {
                    if cert.raw == intermediate.raw {
                        continue 'next_intermediate;
                    }
                }
                if let Err(err) =
                    intermediate.is_valid(CertificateRole::Intermediate, current_chain, opts)
                {
                    log::debug!("rejecting candidate intermediate {intermediate}: {err}");
                    last_err = Some(err);
                    continue;
                }

                let child_chains = match cache.get(&index) {
                    Some(cached) => cached.clone(),
                    None => {
                        let extended = append_to_fresh_chain(current_chain, intermediate);
                        let computed =
                            match intermediate.build_chains(cache, &extended, roots, opts) {
                                Ok(found) => found,
                                Err(err) => {
                                    last_err = Some(err);
                                    Vec::new()
                                }
                            };
                        cache.insert(index, computed.clone());
                        computed
                    }
                };
                chains.extend(child_chains);
            }
        }

        if chains.is_empty() {
            if let Some(err) = last_err {
                return Err(err);
            }
            let (hint_cert, hint_err) = match (root_hint, intermediate_hint) {
                (Some((i, err)), _) => (Some(roots.cert(i).clone()), Some(err)),
                (None, Some((cert, err))) => (Some(cert), Some(err)),
                (None, None) => (None, None),
            };
            return Err(Error::UnknownAuthority {
                hint_cert: hint_cert.map(Box::new),
                hint_err: hint_err.map(Box::new),
            });
        }
        Ok(chains)
    }

    /// Whether `parent`'s signature over this certificate verifies, after
    /// checking that `parent` is authorized to sign certificates at all.
    pub fn check_signature_from(&self, parent: &Certificate) -> Result<()> {
        check_signature_from(self, parent)
    }
}

pub(crate) fn check_signature_from(child: &Certificate, parent: &Certificate) -> Result<()> {
    // An X.509 v3 CA must carry basic constraints with the CA flag set.
    if (parent.version == 3 && !parent.basic_constraints_valid)
        || (parent.basic_constraints_valid && !parent.is_ca)
    {
        return Err(Error::NotAuthorizedToSign);
    }

    if let Some(usage) = &parent.key_usage {
        if !usage.0.is_empty() && !usage.key_cert_sign() {
            return Err(Error::NotAuthorizedToSign);
        }
    }

    if parent.public_key_algorithm == PublicKeyAlgorithm::Unknown {
        return Err(Error::UnsupportedAlgorithm);
    }

    if child.signature_algorithm != SignatureAlgorithm::Sm2WithSm3 {
        return Err(Error::UnsupportedAlgorithm);
    }
    let Some(public) = parent.public_key.as_ref() else {
        return Err(Error::UnsupportedAlgorithm);
    };

    if sign::verify_digest(public, &child.signature, &child.raw_tbs)? {
        Ok(())
    } else {
        Err(Error::InvalidSignature)
    }
}

fn append_to_fresh_chain(chain: &[Certificate], cert: &Certificate) -> Vec<Certificate> {
    let mut fresh = Vec::with_capacity(chain.len() + 1);
    fresh.extend_from_slice(chain);
    fresh.push(cert.clone());
    fresh
}

/// Whether the chain supports all requested usages, walking root to leaf.
/// A certificate without an EKU extension imposes no restriction; a
/// certificate carrying `anyExtendedKeyUsage` likewise restricts nothing.
fn check_chain_for_key_usage(chain: &[Certificate], key_usages: &[ExtKeyUsage]) -> bool {
    if chain.is_empty() {
        return false;
    }

    let mut usages: Vec<Option<ExtKeyUsage>> = key_usages.iter().copied().map(Some).collect();
    let mut remaining = usages.len();

    for cert in chain.iter().rev() {
        if cert.ext_key_usage.is_empty() && cert.unknown_ext_key_usage.is_empty() {
            continue;
        }
        if cert.ext_key_usage.contains(&ExtKeyUsage::Any) {
            continue;
        }

        'requested: for slot in usages.iter_mut() {
            let Some(requested) = *slot else {
                continue;
            };
            for &usage in &cert.ext_key_usage {
                if requested == usage {
                    continue 'requested;
                }
                // The legacy server-gated-crypto purposes imply server auth.
                if requested == ExtKeyUsage::ServerAuth
                    && (usage == ExtKeyUsage::NetscapeServerGatedCrypto
                        || usage == ExtKeyUsage::MicrosoftServerGatedCrypto)
                {
                    continue 'requested;
                }
            }

            *slot = None;
            remaining -= 1;
            if remaining == 0 {
                return false;
            }
        }
    }

    true
}

/// Case-insensitive hostname match with single-label wildcard support:
/// a `*` pattern label matches exactly one host label.
fn match_hostnames(pattern: &str, host: &str) -> bool {
    let pattern = pattern.trim_end_matches('.').to_ascii_lowercase();
    let host = host.trim_end_matches('.');
    if pattern.is_empty() || host.is_empty() {
        return false;
    }

    let pattern_labels: Vec<&str> = pattern.split('.').collect();
    let host_labels: Vec<&str> = host.split('.').collect();
    if pattern_labels.len() != host_labels.len() {
        return false;
    }

    pattern_labels
        .iter()
        .zip(&host_labels)
        .all(|(p, h)| *p == "*" || p == h)
}
