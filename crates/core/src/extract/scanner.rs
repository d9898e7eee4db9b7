use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    NewClient,
    MessageForClient,
    ServiceLogged,
    Proposal,
}

/// One delimited segment found in the assistant's reply: the raw text
/// between an open marker and the matching close marker of the same kind.
#[derive(Clone, Debug, PartialEq)]
pub struct RawBlock {
    pub kind: BlockKind,
    /// Inline addressee carried by `[MENSAJE PARA CLIENTE: <name>]`.
    pub addressee: Option<String>,
    pub body: String,
    /// Byte range of the whole block (markers included) in the source text.
    pub span: Range<usize>,
}

enum Marker {
    Open(BlockKind, Option<String>),
    Close(BlockKind),
}

fn classify(inner: &str) -> Option<Marker> {
    let folded = inner.trim().to_lowercase();
    match folded.as_str() {
        "cliente nuevo" => return Some(Marker::Open(BlockKind::NewClient, None)),
        "servicio registrado" => return Some(Marker::Open(BlockKind::ServiceLogged, None)),
        "propuesta" => return Some(Marker::Open(BlockKind::Proposal, None)),
        "fin cliente" => return Some(Marker::Close(BlockKind::NewClient)),
        "fin mensaje" => return Some(Marker::Close(BlockKind::MessageForClient)),
        "fin servicio" => return Some(Marker::Close(BlockKind::ServiceLogged)),
        "fin propuesta" => return Some(Marker::Close(BlockKind::Proposal)),
        _ => {}
    }
    if folded.starts_with("mensaje para cliente") {
        let addressee = inner
            .split_once(':')
            .map(|(_, name)| name.trim().to_string())
            .filter(|name| !name.is_empty());
        return Some(Marker::Open(BlockKind::MessageForClient, addressee));
    }
    None
}

struct OpenBlock {
    kind: BlockKind,
    addressee: Option<String>,
    start: usize,
    body_start: usize,
}

/// Split raw assistant text into structured blocks, in textual order.
///
/// Text outside marker pairs is conversational prose and is ignored.
/// Unterminated blocks are discarded, and a fresh open marker while a
/// block is still open discards the open one: partial structured data is
/// unsafe to apply. Stray or mismatched close markers are skipped.
pub fn scan(text: &str) -> Vec<RawBlock> {
    let mut blocks = Vec::new();
    let mut open: Option<OpenBlock> = None;
    let mut cursor = 0;

    while let Some(offset) = text[cursor..].find('[') {
        let bracket = cursor + offset;
        let Some(close_offset) = text[bracket + 1..].find(']') else {
            break;
        };
        let end = bracket + 1 + close_offset;
        let inner = &text[bracket + 1..end];

        match classify(inner) {
            Some(Marker::Open(kind, addressee)) => {
                // A second open discards whatever was pending.
                open = Some(OpenBlock { kind, addressee, start: bracket, body_start: end + 1 });
                cursor = end + 1;
            }
            Some(Marker::Close(kind)) => {
                match open.take() {
                    Some(pending) if pending.kind == kind => {
                        blocks.push(RawBlock {
                            kind: pending.kind,
                            addressee: pending.addressee,
                            body: text[pending.body_start..bracket].to_string(),
                            span: pending.start..end + 1,
                        });
                    }
                    // Mismatched close: the open block is malformed, drop both.
                    _ => {}
                }
                cursor = end + 1;
            }
            None => {
                // Not a marker; rescan from just past the bracket so a real
                // marker nested after stray bracketed prose is still found.
                cursor = bracket + 1;
            }
        }
    }

    blocks
}

/// Remove all block spans from the text, leaving the conversational prose
/// the UI shows to the human.
pub fn strip_blocks(text: &str) -> String {
    let mut prose = String::with_capacity(text.len());
    let mut cursor = 0;
    for block in scan(text) {
        if block.span.start > cursor {
            prose.push_str(&text[cursor..block.span.start]);
        }
        cursor = block.span.end;
    }
    if cursor < text.len() {
        prose.push_str(&text[cursor..]);
    }
    tidy_whitespace(&prose)
}

fn tidy_whitespace(text: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut blank_pending = false;
    for line in text.lines().map(str::trim_end) {
        if line.trim().is_empty() {
            blank_pending = !lines.is_empty();
            continue;
        }
        if blank_pending {
            lines.push("");
            blank_pending = false;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::{scan, strip_blocks, BlockKind};

    #[test]
    fn finds_blocks_in_textual_order() {
        let text = "Listo Jaime.\n\
                    [CLIENTE NUEVO]\nNombre: John Smith\n[FIN CLIENTE]\n\
                    Le mando la propuesta:\n\
                    [PROPUESTA]\nCliente: John Smith\nServicios:\n- Tree trimming: $120\n[FIN PROPUESTA]";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].kind, BlockKind::NewClient);
        assert_eq!(blocks[1].kind, BlockKind::Proposal);
        assert!(blocks[0].body.contains("Nombre: John Smith"));
    }

    #[test]
    fn message_marker_carries_the_addressee() {
        let text = "[MENSAJE PARA CLIENTE: John Smith]\nHi John, see you Tuesday.\n[FIN MENSAJE]";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::MessageForClient);
        assert_eq!(blocks[0].addressee.as_deref(), Some("John Smith"));
        assert_eq!(blocks[0].body.trim(), "Hi John, see you Tuesday.");
    }

    #[test]
    fn single_line_blocks_are_recognized() {
        let text = "[CLIENTE NUEVO] Nombre: John Smith Teléfono: 831-555-1234 [FIN CLIENTE]";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body.trim(), "Nombre: John Smith Teléfono: 831-555-1234");
    }

    #[test]
    fn unterminated_block_is_discarded() {
        let blocks = scan("[CLIENTE NUEVO]\nNombre: John Smith\nand then I forgot to close it");
        assert!(blocks.is_empty());
    }

    #[test]
    fn new_open_marker_discards_the_pending_block() {
        let text = "[CLIENTE NUEVO]\nNombre: John\n[PROPUESTA]\nCliente: Ana\nServicios:\n- Poda: $90\n[FIN PROPUESTA]";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::Proposal);
    }

    #[test]
    fn mismatched_close_discards_the_open_block() {
        let blocks = scan("[CLIENTE NUEVO]\nNombre: John\n[FIN PROPUESTA]");
        assert!(blocks.is_empty());
    }

    #[test]
    fn stray_close_and_plain_brackets_are_ignored() {
        let text = "[FIN CLIENTE] como dije [ver nota] nada mas";
        assert!(scan(text).is_empty());
    }

    #[test]
    fn bracketed_prose_before_a_marker_does_not_hide_it() {
        let text = "aviso [urgente [CLIENTE NUEVO] Nombre: Ana [FIN CLIENTE]";
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].kind, BlockKind::NewClient);
    }

    #[test]
    fn marker_case_is_folded() {
        let blocks = scan("[cliente nuevo] Nombre: Ana [fin cliente]");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn strip_blocks_leaves_only_prose() {
        let text = "Claro Jaime, ya lo registré.\n\n\
                    [CLIENTE NUEVO]\nNombre: John Smith\n[FIN CLIENTE]\n\n\
                    ¿Algo más?";
        assert_eq!(strip_blocks(text), "Claro Jaime, ya lo registré.\n\n¿Algo más?");
    }

    #[test]
    fn strip_blocks_on_plain_prose_is_identity_modulo_trim() {
        assert_eq!(strip_blocks("  hola\n\n\nJaime  "), "hola\n\nJaime");
    }
}
