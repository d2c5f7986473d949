use anyhow::{Context, Result, anyhow};
use std::path::Path;
use std::process::{Command, Stdio};

use crate::models::StreamDescriptor;

// Argumentos do mpv para um stream, repassando os cabeçalhos obrigatórios
pub fn mpv_args(stream: &StreamDescriptor) -> Vec<String> {
    let mut args = vec![
        "--no-terminal".to_string(), // Não usa o terminal para output
        "--force-window=yes".to_string(),
        "--keep-open=yes".to_string(),
        "--ytdl=no".to_string(), // Desativa o uso interno do youtube-dl
        format!("--force-media-title={}", stream.label),
    ];

    let mut extra = Vec::new();
    for (name, value) in &stream.request_headers {
        match name.to_ascii_lowercase().as_str() {
            "referer" => args.push(format!("--referrer={}", value)),
            "user-agent" => args.push(format!("--user-agent={}", value)),
            // Vírgulas separam campos no mpv
            _ => extra.push(format!("{}: {}", name, value.replace(',', "\\,"))),
        }
    }
    if !extra.is_empty() {
        args.push(format!("--http-header-fields={}", extra.join(",")));
    }

    args.push(stream.playable_url.clone());
    args
}

// Função para reproduzir o stream com MPV
pub fn play_with_mpv(stream: &StreamDescriptor) -> Result<()> {
    let mpv_path = find_mpv()?;

    let status = Command::new(&mpv_path)
        .args(mpv_args(stream))
        .stdout(Stdio::null())
        .status()
        .context("Falha ao iniciar o mpv")?;

    if !status.success() {
        return Err(anyhow!("mpv terminou com erro: {}", status));
    }
    Ok(())
}

fn find_mpv() -> Result<String> {
    // Verificar se mpv está instalado normalmente
    if let Ok(output) = Command::new("which").arg("mpv").output() {
        if output.status.success() {
            let path = String::from_utf8(output.stdout)
                .map_err(|_| anyhow!("Erro ao converter caminho do MPV"))?;
            return Ok(path.trim().to_string());
        }
    }

    // Tentar caminhos comuns
    for path in &["/usr/bin/mpv", "/usr/local/bin/mpv", "/bin/mpv"] {
        if Path::new(path).exists() {
            return Ok(path.to_string());
        }
    }
    Err(anyhow!("mpv não encontrado"))
}
