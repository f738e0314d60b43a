use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestWorkspace {
    pub root: TempDir,
}

impl TestWorkspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.path().to_path_buf()
    }

    #[allow(dead_code)]
    pub fn write_api_keys(&self, content: &str) -> PathBuf {
        let path = self.root.path().join("api-keys.json");
        fs::write(&path, content).unwrap();
        path
    }

    pub fn write_credentials(&self, tunnel_id: &str) -> PathBuf {
        let path = self.root.path().join("credentials.json");
        fs::write(
            &path,
            format!(
                r#"{{"AccountTag":"acct","TunnelSecret":"c2VjcmV0","TunnelID":"{}"}}"#,
                tunnel_id
            ),
        )
        .unwrap();
        path
    }

    #[allow(dead_code)]
    pub fn write_config(&self, tunnel_id: &str) -> PathBuf {
        let path = self.root.path().join(format!("{}-config.yml", tunnel_id));
        fs::write(
            &path,
            format!(
                "tunnel: {}\ncredentials-file: ./credentials.json\ningress:\n- hostname: a.test\n  service: http://localhost:8080\n- service: http_status:404\n",
                tunnel_id
            ),
        )
        .unwrap();
        path
    }

    /// Executable stand-in for cloudflared
    #[allow(dead_code)]
    #[cfg(unix)]
    pub fn write_fake_cloudflared(&self, script: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.root.path().join("cloudflared");
        fs::write(&path, format!("#!/bin/sh\n{}\n", script)).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }
}
