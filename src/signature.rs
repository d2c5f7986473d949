//! Decodificador da assinatura `sig` usada pelos links do VidGuard.
//!
//! O valor de `sig` passa por seis etapas, nesta ordem:
//! hex/XOR 0x02, base64, corte de 5, inversão, troca em pares, corte de 5.
//! Qualquer falha devolve a URL original (o player tenta o link cru).

use base64::Engine;
use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{debug, warn};

static SIG_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]sig=([^&]*)").unwrap());

// O atob() do navegador aceita bits finais não canônicos
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

const XOR_KEY: u8 = 0x02;
const TRIM: usize = 5;

#[derive(Debug, Error, PartialEq)]
pub enum DecodeError {
    #[error("invalid hex in signature: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid base64 in signature: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Reescreve o parâmetro `sig` da URL com a assinatura corrigida.
///
/// Total: sem `sig=` é a identidade, e qualquer etapa inválida devolve
/// a URL original sem alterações.
pub fn decode(url: &str) -> String {
    let Some(caps) = SIG_PARAM.captures(url) else {
        return url.to_string();
    };
    let Some(sig) = caps.get(1) else {
        return url.to_string();
    };

    match decode_signature(sig.as_str()) {
        Ok(fixed) => {
            debug!(original = sig.as_str(), decoded = %fixed, "signature decoded");
            let mut out = String::with_capacity(url.len());
            out.push_str(&url[..sig.start()]);
            out.push_str(&fixed);
            out.push_str(&url[sig.end()..]);
            out
        }
        Err(e) => {
            warn!(error = %e, "signature decode failed, keeping raw url");
            url.to_string()
        }
    }
}

/// Aplica as seis etapas ao valor cru de `sig`.
pub fn decode_signature(sig: &str) -> Result<String, DecodeError> {
    let t = hex_xor_stage(sig)?;
    let d = base64_stage(&t)?;

    // Os bytes de atob() viram caracteres um a um (Latin-1)
    let mut chars: Vec<char> = d.into_iter().map(char::from).collect();
    chars.truncate(chars.len().saturating_sub(TRIM));
    chars.reverse();
    swap_pairs(&mut chars);
    chars.truncate(chars.len().saturating_sub(TRIM));

    Ok(chars.into_iter().collect())
}

// Etapa 1: pares hex -> byte ^ 0x02. Um nibble final ímpar é descartado.
fn hex_xor_stage(sig: &str) -> Result<String, DecodeError> {
    let even = &sig.as_bytes()[..sig.len() - sig.len() % 2];
    let bytes = hex::decode(even)?;
    Ok(bytes.into_iter().map(|b| char::from(b ^ XOR_KEY)).collect())
}

// Etapa 2: completa com '=' até múltiplo de 4 e decodifica
fn base64_stage(t: &str) -> Result<Vec<u8>, DecodeError> {
    let mut padded = t.to_string();
    match t.len() % 4 {
        3 => padded.push('='),
        2 => padded.push_str("=="),
        _ => {}
    }
    Ok(LENIENT_BASE64.decode(padded.as_bytes())?)
}

// Etapa 5: troca cada par adjacente; um último caractere isolado fica onde está
fn swap_pairs(chars: &mut [char]) {
    for pair in chars.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD_NO_PAD;
    use proptest::prelude::*;

    // Inverso das seis etapas, para montar fixtures
    pub(crate) fn encode_signature(plain: &str) -> String {
        let mut s: Vec<char> = plain.chars().collect();
        s.extend("XXXXX".chars());
        swap_pairs(&mut s);
        s.reverse();
        s.extend("YYYYY".chars());
        let bytes: Vec<u8> = s.into_iter().map(|c| c as u8).collect();
        let t = STANDARD_NO_PAD.encode(bytes);
        t.bytes().map(|b| format!("{:02x}", b ^ XOR_KEY)).collect()
    }

    #[test]
    fn url_without_sig_is_identity() {
        let url = "https://cdn.example.com/master.m3u8?expires=1&hash=abc";
        assert_eq!(decode(url), url);
        assert_eq!(decode(&decode(url)), url);
    }

    #[test]
    fn hex_xor_stage_matches_fixture() {
        assert_eq!(hex_xor_stage("41464343").unwrap(), "CDAA");
    }

    #[test]
    fn odd_trailing_nibble_is_dropped() {
        assert_eq!(hex_xor_stage("414643434").unwrap(), "CDAA");
    }

    #[test]
    fn base64_stage_pads_and_decodes_fixture() {
        assert_eq!(base64_stage("CDAA").unwrap(), vec![0x08, 0x30, 0x00]);
        // resto 3 -> um '='
        assert_eq!(base64_stage("CDA").unwrap(), vec![0x08, 0x30]);
        // resto 2 -> dois '='
        assert_eq!(base64_stage("CD").unwrap(), vec![0x08]);
    }

    #[test]
    fn short_fixture_collapses_to_empty_signature() {
        // "CDAA" decodifica em 3 bytes, os cortes de 5 esvaziam tudo
        assert_eq!(decode_signature("41464343").unwrap(), "");
        assert_eq!(
            decode("https://v.example.com/a.m3u8?sig=41464343&t=1"),
            "https://v.example.com/a.m3u8?sig=&t=1"
        );
    }

    #[test]
    fn swap_pairs_leaves_odd_tail() {
        let mut chars: Vec<char> = "abcde".chars().collect();
        swap_pairs(&mut chars);
        assert_eq!(chars.into_iter().collect::<String>(), "badce");
    }

    #[test]
    fn invalid_hex_fails_open() {
        let url = "https://v.example.com/a.m3u8?sig=zz41&x=2";
        assert_eq!(decode(url), url);
        assert!(matches!(decode_signature("zz41"), Err(DecodeError::Hex(_))));
    }

    #[test]
    fn invalid_base64_fails_open() {
        // '!' ^ 0x02 = '#', fora do alfabeto base64
        let url = "https://v.example.com/a.m3u8?sig=21212121";
        assert_eq!(decode(url), url);
        assert!(matches!(
            decode_signature("21212121"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn single_leftover_base64_char_fails_open() {
        // 5 caracteres -> resto 1, sem padding possível
        let url = "https://v.example.com/a.m3u8?sig=4346434343";
        assert_eq!(decode(url), url);
    }

    #[test]
    fn decodes_known_signature_in_place() {
        let sig = encode_signature("0123456789abcdef");
        let url = format!("https://v.example.com/hls/x.m3u8?sig={}&expires=99", sig);
        assert_eq!(
            decode(&url),
            "https://v.example.com/hls/x.m3u8?sig=0123456789abcdef&expires=99"
        );
    }

    #[test]
    fn only_query_parameter_is_rewritten() {
        let sig = encode_signature("abcdefghijkl");
        let url = format!("https://v.example.com/{}/x.m3u8?sig={}", sig, sig);
        let decoded = decode(&url);
        assert!(decoded.starts_with(&format!("https://v.example.com/{}/", sig)));
        assert!(decoded.ends_with("?sig=abcdefghijkl"));
    }

    proptest! {
        #[test]
        fn round_trip_reproduces_plaintext(plain in "[A-Za-z0-9_-]{10,64}") {
            let sig = encode_signature(&plain);
            prop_assert_eq!(decode_signature(&sig).unwrap(), plain);
        }
    }
}
