use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 内容寻址的头像落盘目录：键是字节的十六进制摘要，
/// 文件一经写入不再改动，同键重写是空操作
#[derive(Debug, Clone)]
pub struct AvatarStore {
    dir: PathBuf,
}

impl AvatarStore {
    pub fn new(dir: impl AsRef<Path>) -> io::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn path_for(&self, hash: &str) -> PathBuf {
        self.dir.join(format!("{}.jpg", hash))
    }

    pub async fn exists(&self, hash: &str) -> io::Result<bool> {
        fs::try_exists(self.path_for(hash)).await
    }

    /// 写入返回 true，已存在跳过返回 false。
    /// 先写临时文件再同目录 rename，避免读到半截文件
    pub async fn write(&self, hash: &str, bytes: &[u8]) -> io::Result<bool> {
        let dest = self.path_for(hash);
        if fs::try_exists(&dest).await? {
            return Ok(false);
        }
        let tmp = self.dir.join(format!(".{}.tmp", hash));
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &dest).await?;
        Ok(true)
    }

    pub async fn remove(&self, hash: &str) -> io::Result<()> {
        fs::remove_file(self.path_for(hash)).await
    }
}
