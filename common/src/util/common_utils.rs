use hex::encode;
use md5::{Digest, Md5};

/// 对原始字节做 MD5，返回十六进制摘要（头像内容寻址键）
pub fn build_md5_bytes(content: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(content);
    let result = hasher.finalize();
    encode(result)
}
