use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::client::Language;
use crate::extract::scanner::{BlockKind, RawBlock};
use crate::extract::{
    Block, LineItem, MessageFields, NewClientFields, ProposalFields, ServiceFields,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BlockError {
    #[error("{kind:?} block is missing required field `{field}`")]
    MissingField { kind: BlockKind, field: &'static str },
    #[error("unparsable price `{raw}` in {kind:?} block")]
    UnparsablePrice { kind: BlockKind, raw: String },
    #[error("{kind:?} block has no usable line items")]
    NoLineItems { kind: BlockKind },
    #[error("message block for `{client}` has empty content")]
    EmptyMessage { client: String },
}

/// Canonical field identity behind the bilingual label aliases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldKey {
    Name,
    Phone,
    Email,
    Address,
    Language,
    Client,
    Service,
    Price,
    Services,
    Total,
    Notes,
}

impl FieldKey {
    fn label(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Email => "email",
            Self::Address => "address",
            Self::Language => "language",
            Self::Client => "client",
            Self::Service => "service",
            Self::Price => "price",
            Self::Services => "services",
            Self::Total => "total",
            Self::Notes => "notes",
        }
    }
}

fn alias(label: &str) -> Option<FieldKey> {
    match label.trim().to_lowercase().as_str() {
        "nombre" | "name" => Some(FieldKey::Name),
        "teléfono" | "telefono" | "phone" => Some(FieldKey::Phone),
        "correo" | "email" => Some(FieldKey::Email),
        "dirección" | "direccion" | "address" => Some(FieldKey::Address),
        "idioma" | "language" => Some(FieldKey::Language),
        "cliente" | "client" => Some(FieldKey::Client),
        "servicio" | "service" => Some(FieldKey::Service),
        "precio" | "price" => Some(FieldKey::Price),
        "servicios" | "services" => Some(FieldKey::Services),
        "total" => Some(FieldKey::Total),
        "notas" | "notes" => Some(FieldKey::Notes),
        _ => None,
    }
}

/// Parse a currency value out of conversational text: first numeric run,
/// currency symbol and thousands separators stripped, rounded to cents.
fn parse_currency(raw: &str) -> Option<Decimal> {
    let first_digit = raw.find(|ch: char| ch.is_ascii_digit())?;
    // The sign may be separated from the digits by a currency symbol
    // ("-$5"), so look for it anywhere before the first digit.
    let negative = raw[..first_digit].contains('-');
    let digits: String = raw[first_digit..]
        .chars()
        .take_while(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == ',')
        .filter(|ch| *ch != ',')
        .collect();
    let digits = digits.trim_end_matches('.');
    let value: Decimal = digits.parse().ok()?;
    Some(if negative { -value.round_dp(2) } else { value.round_dp(2) })
}

/// Split one physical line at every position where a recognized `Label:`
/// begins, so single-line blocks normalize identically to multi-line ones.
fn segment_line(line: &str) -> Vec<&str> {
    let mut cuts = vec![0];
    for (index, ch) in line.char_indices() {
        if ch != ':' {
            continue;
        }
        let label_start = line[..index]
            .rfind(char::is_whitespace)
            .map_or(0, |pos| pos + line[pos..].chars().next().map_or(1, char::len_utf8));
        let label = &line[label_start..index];
        if !label.is_empty() && alias(label).is_some() && label_start > 0 {
            cuts.push(label_start);
        }
    }
    cuts.dedup();
    let mut segments = Vec::with_capacity(cuts.len());
    for (position, start) in cuts.iter().enumerate() {
        let end = cuts.get(position + 1).copied().unwrap_or(line.len());
        segments.push(&line[*start..end]);
    }
    segments
}

/// Split a list blob on `- ` bullets. Text before the first bullet (if
/// any) is dropped by the caller's item parser.
fn split_bullets(text: &str) -> Vec<&str> {
    let mut starts = Vec::new();
    let mut prev: Option<char> = None;
    let mut chars = text.char_indices().peekable();
    while let Some((index, ch)) = chars.next() {
        let next = chars.peek().map(|(_, next)| *next);
        if ch == '-'
            && prev.map_or(true, char::is_whitespace)
            && next.is_some_and(|next| next == ' ')
        {
            starts.push(index);
        }
        prev = Some(ch);
    }
    let mut items = Vec::with_capacity(starts.len());
    for (position, start) in starts.iter().enumerate() {
        let end = starts.get(position + 1).copied().unwrap_or(text.len());
        items.push(&text[*start..end]);
    }
    items
}

/// `- description: price` → LineItem; the last colon separates the price so
/// descriptions may themselves contain colons. Items without a positive,
/// parsable price are unusable and filtered by the caller.
fn parse_line_item(raw: &str) -> Option<LineItem> {
    let raw = raw.trim().trim_start_matches('-').trim_start();
    let (description, price_raw) = raw.rsplit_once(':')?;
    let description = description.trim();
    if description.is_empty() {
        return None;
    }
    let price = parse_currency(price_raw)?;
    if price <= Decimal::ZERO {
        return None;
    }
    Some(LineItem { description: description.to_string(), price })
}

#[derive(Debug, Default)]
struct Collected {
    fields: Vec<(FieldKey, String)>,
    items_raw: Vec<String>,
    extra: Vec<String>,
}

impl Collected {
    fn take(&mut self, key: FieldKey) -> Option<String> {
        let position = self.fields.iter().position(|(candidate, _)| *candidate == key)?;
        Some(self.fields.remove(position).1)
    }

    /// Everything not consumed by the block's own schema lands in the notes
    /// bucket rather than being dropped.
    fn into_notes(mut self) -> Option<String> {
        let mut notes: Vec<String> = Vec::new();
        if let Some(explicit) = self.take(FieldKey::Notes) {
            notes.push(explicit);
        }
        for (key, value) in self.fields {
            notes.push(format!("{}: {value}", key.label()));
        }
        notes.extend(self.extra);
        if notes.is_empty() {
            None
        } else {
            Some(notes.join("\n"))
        }
    }
}

fn collect(body: &str) -> Collected {
    let mut collected = Collected::default();
    for line in body.lines() {
        for segment in segment_line(line) {
            let segment = segment.trim();
            if segment.is_empty() {
                continue;
            }
            if segment.starts_with("- ") {
                collected
                    .items_raw
                    .extend(split_bullets(segment).into_iter().map(str::to_string));
                continue;
            }
            let field = segment.split_once(':').and_then(|(label, value)| {
                alias(label).map(|key| (key, value))
            });
            match field {
                Some((FieldKey::Services, value)) => {
                    collected
                        .items_raw
                        .extend(split_bullets(value).into_iter().map(str::to_string));
                }
                Some((key, value)) => collected.fields.push((key, value.trim().to_string())),
                None => collected.extra.push(segment.to_string()),
            }
        }
    }
    collected
}

/// Convert a scanned block into its typed form, or fail with the reason the
/// block is unusable. Per-block failure never aborts the turn; the caller
/// skips the block and keeps going.
pub fn normalize(raw: &RawBlock) -> Result<Block, BlockError> {
    match raw.kind {
        BlockKind::NewClient => normalize_new_client(raw),
        BlockKind::MessageForClient => normalize_message(raw),
        BlockKind::ServiceLogged => normalize_service(raw),
        BlockKind::Proposal => normalize_proposal(raw),
    }
}

fn normalize_new_client(raw: &RawBlock) -> Result<Block, BlockError> {
    let mut collected = collect(&raw.body);
    let name = collected
        .take(FieldKey::Name)
        .filter(|name| !name.is_empty())
        .ok_or(BlockError::MissingField { kind: raw.kind, field: "name" })?;
    let phone = collected.take(FieldKey::Phone).filter(|value| !value.is_empty());
    let email = collected.take(FieldKey::Email).filter(|value| !value.is_empty());
    let address = collected.take(FieldKey::Address).filter(|value| !value.is_empty());
    let language = collected.take(FieldKey::Language).map(|value| Language::parse_lenient(&value));
    // Stray bullets in a client block are notes, not line items.
    collected.extra.extend(std::mem::take(&mut collected.items_raw));
    let notes = collected.into_notes();
    Ok(Block::NewClient(NewClientFields { name, phone, email, address, language, notes }))
}

fn normalize_message(raw: &RawBlock) -> Result<Block, BlockError> {
    let client_name = raw
        .addressee
        .clone()
        .filter(|name| !name.trim().is_empty())
        .ok_or(BlockError::MissingField { kind: raw.kind, field: "client" })?;
    let content = raw.body.trim().to_string();
    if content.is_empty() {
        return Err(BlockError::EmptyMessage { client: client_name });
    }
    Ok(Block::MessageForClient(MessageFields { client_name, content }))
}

fn normalize_service(raw: &RawBlock) -> Result<Block, BlockError> {
    let mut collected = collect(&raw.body);
    let client_name = collected
        .take(FieldKey::Client)
        .filter(|name| !name.is_empty())
        .ok_or(BlockError::MissingField { kind: raw.kind, field: "client" })?;

    let items = if collected.items_raw.is_empty() {
        // Single Servicio/Precio pair; here the price is a required field
        // and an unparsable value is malformed rather than filtered.
        let description = collected
            .take(FieldKey::Service)
            .filter(|value| !value.is_empty())
            .ok_or(BlockError::MissingField { kind: raw.kind, field: "service" })?;
        let price_raw = collected
            .take(FieldKey::Price)
            .ok_or(BlockError::MissingField { kind: raw.kind, field: "price" })?;
        let price = parse_currency(&price_raw)
            .filter(|price| *price > Decimal::ZERO)
            .ok_or_else(|| BlockError::UnparsablePrice { kind: raw.kind, raw: price_raw })?;
        vec![LineItem { description, price }]
    } else {
        let items: Vec<LineItem> = std::mem::take(&mut collected.items_raw)
            .iter()
            .filter_map(|raw_item| parse_line_item(raw_item))
            .collect();
        if items.is_empty() {
            return Err(BlockError::NoLineItems { kind: raw.kind });
        }
        items
    };

    let notes = collected.into_notes();
    Ok(Block::ServiceLogged(ServiceFields { client_name, items, notes }))
}

fn normalize_proposal(raw: &RawBlock) -> Result<Block, BlockError> {
    let mut collected = collect(&raw.body);
    let client_name = collected
        .take(FieldKey::Client)
        .filter(|name| !name.is_empty())
        .ok_or(BlockError::MissingField { kind: raw.kind, field: "client" })?;
    let stated_total = collected.take(FieldKey::Total).and_then(|value| parse_currency(&value));
    let items: Vec<LineItem> = std::mem::take(&mut collected.items_raw)
        .iter()
        .filter_map(|raw_item| parse_line_item(raw_item))
        .collect();
    if items.is_empty() {
        return Err(BlockError::NoLineItems { kind: raw.kind });
    }
    let notes = collected.into_notes();
    Ok(Block::Proposal(ProposalFields { client_name, items, stated_total, notes }))
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::{normalize, parse_currency, BlockError};
    use crate::domain::client::Language;
    use crate::extract::scanner::{scan, BlockKind};
    use crate::extract::Block;

    fn normalize_one(text: &str) -> Result<Block, BlockError> {
        let blocks = scan(text);
        assert_eq!(blocks.len(), 1, "expected exactly one block in {text:?}");
        normalize(&blocks[0])
    }

    #[test]
    fn currency_parsing_strips_symbols_and_separators() {
        assert_eq!(parse_currency("$1,250.50"), Some(Decimal::new(125050, 2)));
        assert_eq!(parse_currency("  $120 "), Some(Decimal::new(120, 0)));
        assert_eq!(parse_currency("145."), Some(Decimal::new(145, 0)));
        assert_eq!(parse_currency("120 dólares"), Some(Decimal::new(120, 0)));
        assert_eq!(parse_currency("-$5"), Some(Decimal::new(-5, 0)));
        assert_eq!(parse_currency("gratis"), None);
    }

    #[test]
    fn spanish_labels_map_to_canonical_fields() {
        let block = normalize_one(
            "[CLIENTE NUEVO]\nNombre: Maria Garcia\nTeléfono: 831-555-9876\nDirección: 12 Oak St\nIdioma: español\n[FIN CLIENTE]",
        )
        .expect("normalize");
        let Block::NewClient(fields) = block else { panic!("expected client block") };
        assert_eq!(fields.name, "Maria Garcia");
        assert_eq!(fields.phone.as_deref(), Some("831-555-9876"));
        assert_eq!(fields.address.as_deref(), Some("12 Oak St"));
        assert_eq!(fields.language, Some(Language::Spanish));
    }

    #[test]
    fn english_labels_work_too() {
        let block = normalize_one(
            "[CLIENTE NUEVO]\nName: Bob Lee\nPhone: 831-555-0000\nEmail: bob@lee.com\n[FIN CLIENTE]",
        )
        .expect("normalize");
        let Block::NewClient(fields) = block else { panic!("expected client block") };
        assert_eq!(fields.name, "Bob Lee");
        assert_eq!(fields.email.as_deref(), Some("bob@lee.com"));
    }

    #[test]
    fn single_line_client_block_splits_on_known_labels() {
        let block = normalize_one(
            "[CLIENTE NUEVO] Nombre: John Smith Teléfono: 831-555-1234 [FIN CLIENTE]",
        )
        .expect("normalize");
        let Block::NewClient(fields) = block else { panic!("expected client block") };
        assert_eq!(fields.name, "John Smith");
        assert_eq!(fields.phone.as_deref(), Some("831-555-1234"));
    }

    #[test]
    fn missing_name_is_malformed() {
        let error = normalize_one("[CLIENTE NUEVO]\nTeléfono: 831-555-1234\n[FIN CLIENTE]")
            .expect_err("missing name");
        assert_eq!(error, BlockError::MissingField { kind: BlockKind::NewClient, field: "name" });
    }

    #[test]
    fn unrecognized_labels_and_prose_land_in_notes() {
        let block = normalize_one(
            "[CLIENTE NUEVO]\nNombre: Ana Ruiz\nJardinero: Pedro\nle gusta el pasto corto\nNotas: paga trimestral\n[FIN CLIENTE]",
        )
        .expect("normalize");
        let Block::NewClient(fields) = block else { panic!("expected client block") };
        let notes = fields.notes.expect("notes bucket");
        assert!(notes.contains("paga trimestral"));
        assert!(notes.contains("Jardinero: Pedro"));
        assert!(notes.contains("le gusta el pasto corto"));
    }

    #[test]
    fn service_block_with_single_pair() {
        let block = normalize_one(
            "[SERVICIO REGISTRADO]\nCliente: Maria Garcia\nServicio: Podar árboles\nPrecio: $150\n[FIN SERVICIO]",
        )
        .expect("normalize");
        let Block::ServiceLogged(fields) = block else { panic!("expected service block") };
        assert_eq!(fields.client_name, "Maria Garcia");
        assert_eq!(fields.items.len(), 1);
        assert_eq!(fields.items[0].description, "Podar árboles");
        assert_eq!(fields.items[0].price, Decimal::new(150, 0));
    }

    #[test]
    fn service_block_with_unparsable_price_is_malformed() {
        let error = normalize_one(
            "[SERVICIO REGISTRADO]\nCliente: Maria Garcia\nServicio: Podar árboles\nPrecio: luego vemos\n[FIN SERVICIO]",
        )
        .expect_err("unparsable price");
        assert!(matches!(error, BlockError::UnparsablePrice { .. }));
    }

    #[test]
    fn zero_price_is_not_silently_accepted() {
        let error = normalize_one(
            "[SERVICIO REGISTRADO]\nCliente: Maria Garcia\nServicio: Podar árboles\nPrecio: $0\n[FIN SERVICIO]",
        )
        .expect_err("zero price");
        assert!(matches!(error, BlockError::UnparsablePrice { .. }));
    }

    #[test]
    fn negative_price_is_not_silently_accepted() {
        let error = normalize_one(
            "[SERVICIO REGISTRADO]\nCliente: Maria Garcia\nServicio: Credit adjustment\nPrecio: -$5\n[FIN SERVICIO]",
        )
        .expect_err("negative price");
        assert!(matches!(error, BlockError::UnparsablePrice { .. }));
    }

    #[test]
    fn proposal_parses_multi_line_service_list() {
        let block = normalize_one(
            "[PROPUESTA]\nCliente: John Smith\nServicios:\n- Tree trimming: $120\n- Sprinkler repair: $25\nTotal: $145\n[FIN PROPUESTA]",
        )
        .expect("normalize");
        let Block::Proposal(fields) = block else { panic!("expected proposal block") };
        assert_eq!(fields.items.len(), 2);
        assert_eq!(fields.items[0].description, "Tree trimming");
        assert_eq!(fields.items[0].price, Decimal::new(120, 0));
        assert_eq!(fields.items[1].price, Decimal::new(25, 0));
        assert_eq!(fields.stated_total, Some(Decimal::new(145, 0)));
    }

    #[test]
    fn proposal_parses_single_line_service_list() {
        let block = normalize_one(
            "[PROPUESTA] Cliente: John Smith Servicios: - Tree trimming: $120 - Sprinkler repair: $25 Total: $145 [FIN PROPUESTA]",
        )
        .expect("normalize");
        let Block::Proposal(fields) = block else { panic!("expected proposal block") };
        assert_eq!(fields.client_name, "John Smith");
        assert_eq!(fields.items.len(), 2);
        assert_eq!(fields.items[1].description, "Sprinkler repair");
        assert_eq!(fields.stated_total, Some(Decimal::new(145, 0)));
    }

    #[test]
    fn proposal_filters_unparsable_items_but_keeps_good_ones() {
        let block = normalize_one(
            "[PROPUESTA]\nCliente: Ana Ruiz\nServicios:\n- Weeding: $40\n- Mystery work: free\n[FIN PROPUESTA]",
        )
        .expect("normalize");
        let Block::Proposal(fields) = block else { panic!("expected proposal block") };
        assert_eq!(fields.items.len(), 1);
        assert_eq!(fields.items[0].description, "Weeding");
    }

    #[test]
    fn proposal_with_no_usable_items_is_malformed() {
        let error = normalize_one(
            "[PROPUESTA]\nCliente: Ana Ruiz\nServicios:\n- Weeding: free\n[FIN PROPUESTA]",
        )
        .expect_err("no usable items");
        assert_eq!(error, BlockError::NoLineItems { kind: BlockKind::Proposal });
    }

    #[test]
    fn proposal_without_client_is_malformed() {
        let error =
            normalize_one("[PROPUESTA]\nServicios:\n- Weeding: $40\n[FIN PROPUESTA]")
                .expect_err("missing client");
        assert_eq!(error, BlockError::MissingField { kind: BlockKind::Proposal, field: "client" });
    }

    #[test]
    fn message_block_keeps_body_verbatim() {
        let block = normalize_one(
            "[MENSAJE PARA CLIENTE: John Smith]\nHi John! Your maintenance visit is Tuesday at 9am.\n[FIN MENSAJE]",
        )
        .expect("normalize");
        let Block::MessageForClient(fields) = block else { panic!("expected message block") };
        assert_eq!(fields.client_name, "John Smith");
        assert_eq!(fields.content, "Hi John! Your maintenance visit is Tuesday at 9am.");
    }

    #[test]
    fn message_without_addressee_is_malformed() {
        let error = normalize_one("[MENSAJE PARA CLIENTE:]\nHi there!\n[FIN MENSAJE]")
            .expect_err("missing addressee");
        assert_eq!(
            error,
            BlockError::MissingField { kind: BlockKind::MessageForClient, field: "client" }
        );
    }

    #[test]
    fn empty_message_body_is_malformed() {
        let error = normalize_one("[MENSAJE PARA CLIENTE: John]\n   \n[FIN MENSAJE]")
            .expect_err("empty content");
        assert!(matches!(error, BlockError::EmptyMessage { .. }));
    }

    #[test]
    fn descriptions_may_contain_colons() {
        let block = normalize_one(
            "[PROPUESTA]\nCliente: Ana\nServicios:\n- Irrigation: valve zone 3: $75\n[FIN PROPUESTA]",
        )
        .expect("normalize");
        let Block::Proposal(fields) = block else { panic!("expected proposal block") };
        assert_eq!(fields.items[0].description, "Irrigation: valve zone 3");
        assert_eq!(fields.items[0].price, Decimal::new(75, 0));
    }
}
