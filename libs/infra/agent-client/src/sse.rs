// [libs/infra/agent-client/src/sse.rs]
/*!
 * =================================================================
 * APARATO: SSE FRAME DECODER
 * CLASIFICACIÓN: INFRASTRUCTURE ADAPTER (ESTRATO L3)
 * RESPONSABILIDAD: DESPOJO DE FRAMING text/event-stream
 *
 * Protocolo: líneas `data: <payload>`, eventos delimitados por línea
 * en blanco, comentarios `: keep-alive` ignorados. El decodificador
 * tolera fragmentación arbitraria de chunks TCP.
 * =================================================================
 */

/// Decodificador incremental de tramas SSE.
#[derive(Debug, Default)]
pub struct SseFrameDecoder {
    /// Resto de línea aún sin terminador.
    partial_line: String,
    /// Líneas `data:` acumuladas del evento en curso.
    pending_data_lines: Vec<String>,
}

impl SseFrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ingesta un chunk crudo y devuelve los payloads de los eventos
    /// completados dentro de él, en orden de llegada.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut completed_payloads = Vec::new();
        let text = String::from_utf8_lossy(chunk);

        for character in text.chars() {
            if character == '\n' {
                let line = std::mem::take(&mut self.partial_line);
                if let Some(payload) = self.ingest_line(line.trim_end_matches('\r')) {
                    completed_payloads.push(payload);
                }
            } else {
                self.partial_line.push(character);
            }
        }

        completed_payloads
    }

    /// Procesa una línea completa. Devuelve el payload cuando la línea en
    /// blanco cierra un evento con datos acumulados.
    fn ingest_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.pending_data_lines.is_empty() {
                return None;
            }
            let payload = self.pending_data_lines.join("\n");
            self.pending_data_lines.clear();
            return Some(payload);
        }

        // Comentario de keep-alive del protocolo.
        if line.starts_with(':') {
            return None;
        }

        if let Some(raw_value) = line.strip_prefix("data:") {
            // La especificación permite un único espacio tras los dos puntos.
            let value = raw_value.strip_prefix(' ').unwrap_or(raw_value);
            self.pending_data_lines.push(value.to_string());
        }

        // Campos event:/id:/retry: no transportan datos en este protocolo.
        None
    }
}
