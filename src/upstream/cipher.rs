use crate::error::UpstreamError;
use crate::r#const::enterprise_limits;
use ecb::cipher::{block_padding::Pkcs7, BlockDecryptMut, BlockEncryptMut, KeyInit};

type DesEcbEnc = ecb::Encryptor<des::Des>;
type DesEcbDec = ecb::Decryptor<des::Des>;

const DES_BLOCK_LEN: usize = 8;

/// 企业版上游使用的 DES-ECB 加密（PKCS#5 填充，十六进制编码）
#[derive(Clone)]
pub struct DesCipher {
    key: [u8; enterprise_limits::SECRET_LEN],
}

impl DesCipher {
    /// 密钥必须恰好 8 字节
    pub fn new(secret: &str) -> Result<Self, UpstreamError> {
        let key: [u8; enterprise_limits::SECRET_LEN] =
            secret.as_bytes().try_into().map_err(|_| {
                UpstreamError::Cipher(format!(
                    "secret must be exactly {} bytes, got {}",
                    enterprise_limits::SECRET_LEN,
                    secret.len()
                ))
            })?;
        Ok(Self { key })
    }

    /// 加密并输出小写十六进制
    pub fn encrypt_hex(&self, plain: &str) -> Result<String, UpstreamError> {
        let encryptor = DesEcbEnc::new_from_slice(&self.key)
            .map_err(|e| UpstreamError::Cipher(e.to_string()))?;
        let ciphertext = encryptor.encrypt_padded_vec_mut::<Pkcs7>(plain.as_bytes());
        Ok(hex::encode(ciphertext))
    }

    /// 十六进制解码后解密
    pub fn decrypt_hex(&self, hex_text: &str) -> Result<String, UpstreamError> {
        let ciphertext = hex::decode(hex_text.trim())
            .map_err(|e| UpstreamError::Cipher(format!("invalid hex payload: {}", e)))?;
        if ciphertext.is_empty() || ciphertext.len() % DES_BLOCK_LEN != 0 {
            return Err(UpstreamError::Cipher(format!(
                "ciphertext length {} is not a multiple of the block size",
                ciphertext.len()
            )));
        }
        let decryptor = DesEcbDec::new_from_slice(&self.key)
            .map_err(|e| UpstreamError::Cipher(e.to_string()))?;
        let plain = decryptor
            .decrypt_padded_vec_mut::<Pkcs7>(&ciphertext)
            .map_err(|e| UpstreamError::Cipher(format!("decrypt failed: {}", e)))?;
        String::from_utf8(plain)
            .map_err(|e| UpstreamError::Cipher(format!("decrypted payload is not UTF-8: {}", e)))
    }
}
