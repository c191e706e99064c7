//! Extraction prompt sent with every document.

/// Instruction asking the model for a single JSON object in the canonical schema.
pub const EXTRACTION_PROMPT: &str = r#"You are reading a scanned cost document (invoice, quote or credit note), most likely written in Bosnian, Croatian or Serbian (Latin or Cyrillic script) or in English.

Extract the following fields and reply with ONLY a JSON object, no explanations and no markdown:

{
  "supplier_name": "company that issued the document",
  "supplier_address": "street and number",
  "supplier_city": "city",
  "supplier_country": "country",
  "supplier_phone": "phone number",
  "supplier_email": "email address",
  "supplier_website": "website",
  "supplier_tax_id": "tax identification number (PDV/ID/JIB/PIB)",
  "document_type": "invoice | quote | credit_note | other",
  "document_number": "document number exactly as printed",
  "issue_date": "YYYY-MM-DD",
  "due_date": "YYYY-MM-DD",
  "subtotal_tax_excluded": 0.00,
  "total_amount": 0.00,
  "vat_rate": 17,
  "currency": "BAM | EUR | USD | RSD",
  "description": "short description of the goods or services",
  "raw_text": "full text of the document, line by line"
}

Rules:
- The supplier is the company that ISSUED the document, not the customer (kupac).
- Amounts are plain numbers with a dot as the decimal separator.
- The total amount includes VAT; the subtotal excludes it.
- "KM" means BAM.
- Use null for any field you cannot find. Never guess."#;
