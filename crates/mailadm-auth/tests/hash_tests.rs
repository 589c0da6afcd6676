//! Hash engine behavior across schemes, including the SSHA fallbacks.

use mailadm_auth::{
    is_supported_scheme, verify, Capabilities, CredentialHasher, HashConfig, Scheme,
};
use proptest::prelude::*;

fn config(prefixed: bool) -> HashConfig {
    HashConfig {
        use_prefixed_scheme: prefixed,
        ..HashConfig::default()
    }
}

fn hasher_with(capabilities: Capabilities) -> CredentialHasher {
    CredentialHasher::with_capabilities(config(true), capabilities)
}

#[tokio::test]
async fn test_two_ssha_hashes_differ_and_are_supported() {
    let hasher = hasher_with(Capabilities::none());
    let first = hasher.hash("p@ssw0rd", Some("SSHA")).await.unwrap();
    let second = hasher.hash("p@ssw0rd", Some("SSHA")).await.unwrap();

    assert_ne!(first, second);
    assert!(is_supported_scheme(&first));
    assert!(is_supported_scheme(&second));
    assert!(verify("p@ssw0rd", &first));
    assert!(verify("p@ssw0rd", &second));
}

#[tokio::test]
async fn test_local_schemes_verify() {
    let hasher = hasher_with(Capabilities {
        bcrypt: true,
        external_tool: None,
    });

    for scheme in [
        Scheme::Plain,
        Scheme::Crypt,
        Scheme::PlainMd5,
        Scheme::Ssha,
        Scheme::Sha512,
        Scheme::Ssha512,
        Scheme::Bcrypt,
    ] {
        let hash = hasher.hash_with("Abc123!@", scheme).await.unwrap();
        assert!(is_supported_scheme(&hash), "{scheme}: {hash}");
        assert!(verify("Abc123!@", &hash), "{scheme} does not verify");
        assert!(!verify("Abc123!#", &hash), "{scheme} accepts a wrong password");
    }
}

#[tokio::test]
async fn test_bcrypt_unavailable_falls_back_to_ssha() {
    let hasher = hasher_with(Capabilities::none());
    let hash = hasher.hash("secret", Some("BCRYPT")).await.unwrap();

    assert!(hash.starts_with("{SSHA}"));
    assert!(verify("secret", &hash));
}

#[tokio::test]
async fn test_missing_tool_falls_back_to_ssha() {
    let hasher = hasher_with(Capabilities::none());

    for scheme in ["CRAM-MD5", "NTLM"] {
        let hash = hasher.hash("secret", Some(scheme)).await.unwrap();
        assert!(hash.starts_with("{SSHA}"), "{scheme}: {hash}");
        assert!(verify("secret", &hash));
    }
}

#[tokio::test]
async fn test_probe_for_unknown_tool_falls_back() {
    let hasher = CredentialHasher::new(HashConfig {
        hash_tool: "no-such-hash-tool-for-mailadm".into(),
        ..HashConfig::default()
    });
    assert_eq!(hasher.capabilities().external_tool, None);

    let hash = hasher.hash("secret", Some("NTLM")).await.unwrap();
    assert!(hash.starts_with("{SSHA}"));
}

#[cfg(unix)]
mod external_tool {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Write an executable shell script standing in for the hashing utility.
    fn fake_tool(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("fake-doveadm");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn hasher_for(tool: PathBuf, prefixed: bool) -> CredentialHasher {
        CredentialHasher::with_capabilities(
            config(prefixed),
            Capabilities {
                bcrypt: true,
                external_tool: Some(tool),
            },
        )
    }

    #[tokio::test]
    async fn test_tool_output_is_rewrapped() {
        let dir = TempDir::new().unwrap();
        // argv: pw -s <SCHEME> -p <plain>
        let tool = fake_tool(&dir, r#"printf '{%s}hash-of-%s\n' "$3" "$5""#);

        let hash = hasher_for(tool.clone(), true)
            .hash("  secret ", Some("cram-md5"))
            .await
            .unwrap();
        assert_eq!(hash, "{CRAM-MD5}hash-of-secret");

        let bare = hasher_for(tool, false)
            .hash("secret", Some("NTLM"))
            .await
            .unwrap();
        assert_eq!(bare, "hash-of-secret");
    }

    #[tokio::test]
    async fn test_tool_failure_falls_back_to_ssha() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "echo 'Fatal: unknown scheme' >&2\nexit 1");

        let hash = hasher_for(tool, true)
            .hash("secret", Some("NTLM"))
            .await
            .unwrap();
        assert!(hash.starts_with("{SSHA}"));
        assert!(verify("secret", &hash));
    }

    #[tokio::test]
    async fn test_tool_with_empty_output_falls_back() {
        let dir = TempDir::new().unwrap();
        let tool = fake_tool(&dir, "exit 0");

        let hash = hasher_for(tool, true)
            .hash("secret", Some("CRAM-MD5"))
            .await
            .unwrap();
        assert!(hash.starts_with("{SSHA}"));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_salted_hashes_verify(plain in "[ -~]{0,40}") {
        let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
        let hasher = hasher_with(Capabilities::none());

        for scheme in [Scheme::Ssha, Scheme::Ssha512, Scheme::Sha512, Scheme::PlainMd5] {
            let hash = runtime.block_on(hasher.hash_with(&plain, scheme)).unwrap();
            prop_assert!(verify(&plain, &hash));
            prop_assert!(is_supported_scheme(&hash));
        }
    }
}
