//! Gazetteer & pattern bank
//!
//! Static vocabulary for Spanish (Ecuadorian) judicial text: institution
//! heads, corporate suffixes, role titles, legal-work and legal-concept
//! vocabulary, plus the structural regexes shared by the miner and the
//! classifier. Built once at startup and shared read-only behind an `Arc`.
//!
//! All vocabulary is stored in normalized form (lowercase, no accents) and
//! every membership test expects normalized input.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use regex::{Captures, Regex};

use crate::normalize::{normalize, normalize_token};

// ============================================================================
// Pattern sources
// ============================================================================

const MONTHS: &str =
    "enero|febrero|marzo|abril|mayo|junio|julio|agosto|septiembre|setiembre|octubre|noviembre|diciembre";

/// `Art.`, `Arts.`, `Artículo`, `Artículos` followed by the number; tolerates
/// real line breaks and the literal `\n` artifact between keyword and number.
const ARTICLE_CITATION: &str = r"(?i)\b(?:art[íi]culos?|arts?\.?)(?:\s|\\n)*(?:n(?:[oº°]|ro)\.?\s*)?\d+(?:\.\d+)*(?:\s*(?:,|y)\s*\d+)*(?:\s+(?:num(?:eral)?\.?|inc(?:iso)?\.?|lit(?:eral)?\.?)\s*\w+)*(?:\s+(?:del|de\s+la|de\s+los|de)\s+(?:(?-i:\p{Lu}{2,}\b)|(?-i:\p{Lu}\p{Ll}+)(?:\s+(?:(?:de|del|la|las|los|y)\s+){0,2}(?-i:\p{Lu}\p{Ll}+))*))?";

/// Up to three lowercase words ahead of a structural expression (`según el`)
const LEAD_IN: &str = r"(?-i:(?:\p{Ll}+\s+){0,3})";

/// Article keyword and number opening a span
const ARTICLE_START: &str = r"(?:art[íi]culos?|arts?\.?)(?:\s|\\n)*(?:n(?:[oº°]|ro)\.?\s*)?\d";

const CASE_NUMBER: &str = r"(?i)\b(?:juicio|proceso|causa|expediente|caso)(?:\s+(?:penal|judicial|constitucional))?\s+n(?:[oº°]|ro)\.?\s*:?\s*\d(?:[\d\-/.]*\d)?";

/// Keyword plus `No`/`Nº`, or a bare `No.`/`Nº`/`Nro.` that carries its mark
const CASE_HEADER: &str = r"(?i)^(?:(?:juicio|proceso|causa|expediente|caso)(?:\s+\p{L}+)?\s+n(?:[oº°]|ro)\.?|n(?:o\.|[º°]\.?|ro\.))\s*:?\s*\d";

const PLACE: &str = r"^(?:Park|Parque|San|Santa|Santo)\s+\p{Lu}\p{Ll}+";

const PERSON_RUN: &str = r"\b\p{Lu}\p{Ll}+(?:[ \t]+\p{Lu}\p{Ll}+){1,3}\b";

const ORGANIZATION_KEYWORD: &str = r"\b(?i:unidad|juzgado|tribunal|corte|fiscal[íi]a|ministerio|consejo|defensor[íi]a|procuradur[íi]a|instituto|secretar[íi]a|superintendencia|direcci[óo]n|polic[íi]a|asamblea|sala|banco|universidad|empresa|compa[ñn][íi]a|cooperativa|servicio|agencia|comisi[óo]n|municipio|gobierno|registro|contralor[íi]a|notar[íi]a|centro)(?:[ \t]+(?:(?i:de|del|la|las|los|y|para|en)[ \t]+){0,2}\p{Lu}(?:\p{Ll}+|[\p{L}.]*))+";

const ORGANIZATION_CORPORATE: &str = r"\b\p{Lu}[\p{L}&.]*(?:[ \t]+\p{Lu}[\p{L}&.]*){0,5}[ \t]*,?[ \t]+(?:S\.A\.S\.?|S\.A\.?|C\.A\.|E\.P\.|(?i:c[ií]a\.?[ \t]+ltda\.?)|(?i:ltda\.?))";

const CRIME: &str = r"(?i)\b(?:homicidio|asesinato|femicidio|sicariato|robo|hurto|abigeato|estafa|secuestro(?:\s+extorsivo)?|extorsi[óo]n|violaci[óo]n|abuso\s+sexual|acoso\s+sexual|peculado|cohecho|concusi[óo]n|enriquecimiento\s+il[íi]cito|lavado\s+de\s+activos|tr[áa]fico\s+il[íi]cito(?:\s+de\s+sustancias\s+catalogadas\s+sujetas\s+a\s+fiscalizaci[óo]n)?|trata\s+de\s+personas|asociaci[óo]n\s+il[íi]cita|delincuencia\s+organizada|lesiones|intimidaci[óo]n|falsificaci[óo]n(?:\s+de\s+firmas)?|uso\s+doloso\s+de\s+documento\s+falso|tenencia\s+(?:y\s+porte\s+)?(?:ilegal\s+)?de\s+armas|porte\s+(?:ilegal\s+)?de\s+armas|receptaci[óo]n|violencia\s+(?:f[íi]sica|psicol[óo]gica|sexual)(?:\s+contra\s+la\s+mujer(?:\s+o\s+miembros\s+del\s+n[úu]cleo\s+familiar)?)?)(?:\s+(?:agravad[oa]|calificad[oa]|simple|culposo|en\s+grado\s+de\s+tentativa))?\b";

/// Opening formula of Ecuadorian judgments
const FORMULA_OPENING: &str = "ADMINISTRANDO JUSTICIA, EN NOMBRE DEL PUEBLO SOBERANO DEL ECUADOR";

/// Words that close the opening formula
const FORMULA_CLOSING: &str = "LEYES DE LA REPÚBLICA";

/// Build a case-insensitive regex matching `phrase` with any run of
/// whitespace or commas between its words (OCR line breaks land anywhere).
fn tolerant_phrase(phrase: &str) -> String {
    let words: Vec<String> = phrase
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|w| !w.is_empty())
        .map(regex::escape)
        .collect();
    format!(r"(?i){}", words.join(r"[\s,]+"))
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("gazetteer pattern should compile")
}

// ============================================================================
// Pattern bank
// ============================================================================

/// Compiled structural patterns
#[derive(Debug)]
pub struct PatternBank {
    /// Article citation anywhere in text
    pub article: Regex,
    /// Article citation at the start of a span, after an optional lowercase lead-in
    pub article_start: Regex,
    /// `D de MONTH de YYYY`
    pub long_date: Regex,
    /// `D/M/YYYY` or `D-M-YYYY`
    pub numeric_date: Regex,
    /// `YYYY-MM-DD`
    pub iso_date: Regex,
    /// A span that is one date, after an optional lowercase lead-in
    pub full_date: Regex,
    /// Case-number prefix plus digits, anywhere in text
    pub case_number: Regex,
    /// Case-number header at the start of a span (requires No. token and digit)
    pub case_header: Regex,
    /// Leading `Park X` / `San X`
    pub place: Regex,
    /// 2-4 consecutive capitalized-then-lowercase tokens
    pub person_run: Regex,
    /// Institution keyword followed by capitalized words
    pub organization_keyword: Regex,
    /// Capitalized words followed by a corporate suffix
    pub organization_corporate: Regex,
    /// Crime vocabulary with optional qualifier
    pub crime: Regex,
    /// Opening judicial formula
    pub formula_opening: Regex,
    /// Closing marker of the judicial formula
    pub formula_closing: Regex,
    /// Capitalized-then-lowercase token shape
    pub capitalized: Regex,
}

impl PatternBank {
    fn new() -> Self {
        let long_date = format!(r"(?i)\b(\d{{1,2}})\s+de\s+({MONTHS})\s+(?:de|del)\s+(\d{{4}})\b");
        let numeric_date = r"\b(\d{1,2})[/-](\d{1,2})[/-](\d{4})\b";
        let iso_date = r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b";
        let full_date = format!(
            r"(?i)^{LEAD_IN}(?:\d{{1,2}}\s+de\s+(?:{MONTHS})\s+(?:de|del)\s+\d{{4}}|\d{{1,2}}[/-]\d{{1,2}}[/-]\d{{4}}|\d{{4}}-\d{{1,2}}-\d{{1,2}})[.,;]?$"
        );

        Self {
            article: compile(ARTICLE_CITATION),
            article_start: compile(&format!(r"(?i)^{LEAD_IN}{ARTICLE_START}")),
            long_date: compile(&long_date),
            numeric_date: compile(numeric_date),
            iso_date: compile(iso_date),
            full_date: compile(&full_date),
            case_number: compile(CASE_NUMBER),
            case_header: compile(CASE_HEADER),
            place: compile(PLACE),
            person_run: compile(PERSON_RUN),
            organization_keyword: compile(ORGANIZATION_KEYWORD),
            organization_corporate: compile(ORGANIZATION_CORPORATE),
            crime: compile(CRIME),
            formula_opening: compile(&tolerant_phrase(FORMULA_OPENING)),
            formula_closing: compile(&tolerant_phrase(FORMULA_CLOSING)),
            capitalized: compile(r"^\p{Lu}\p{Ll}+$"),
        }
    }
}

// ============================================================================
// Gazetteer
// ============================================================================

/// Immutable vocabulary tables and compiled patterns
#[derive(Debug)]
pub struct Gazetteer {
    /// Single-token institution heads (`unidad`, `tribunal`, ...)
    institution_heads: HashSet<&'static str>,
    /// Multi-token institution names matched as whole phrases
    institution_phrases: Vec<&'static str>,
    corporate_suffixes: HashSet<&'static str>,
    role_titles: HashSet<&'static str>,
    legal_work_terms: HashSet<&'static str>,
    legal_concepts: HashSet<&'static str>,
    /// Abstract-noun endings (`-cion`, `-dad`, ...)
    concept_suffixes: Vec<&'static str>,
    /// Leading articles and prepositions
    function_words: HashSet<&'static str>,
    months: HashMap<&'static str, u32>,
    patterns: PatternBank,
}

impl Gazetteer {
    /// Create the gazetteer with the default Spanish judicial vocabulary
    pub fn new() -> Self {
        let mut gazetteer = Self {
            institution_heads: HashSet::new(),
            institution_phrases: Vec::new(),
            corporate_suffixes: HashSet::new(),
            role_titles: HashSet::new(),
            legal_work_terms: HashSet::new(),
            legal_concepts: HashSet::new(),
            concept_suffixes: Vec::new(),
            function_words: HashSet::new(),
            months: HashMap::new(),
            patterns: PatternBank::new(),
        };

        gazetteer.init_institutions();
        gazetteer.init_roles();
        gazetteer.init_legal_vocabulary();
        gazetteer.init_function_words();
        gazetteer.init_months();
        gazetteer
    }

    fn init_institutions(&mut self) {
        self.institution_heads.extend([
            "unidad", "juzgado", "tribunal", "corte", "fiscalia", "ministerio", "consejo",
            "defensoria", "procuraduria", "instituto", "superintendencia", "direccion",
            "departamento", "policia", "asamblea", "sala", "banco", "universidad", "empresa",
            "compania", "cooperativa", "agencia", "comision", "municipio", "gobierno",
            "contraloria", "notaria", "registro", "jefatura", "comando", "subsecretaria",
            "gobernacion", "prefectura", "alcaldia", "judicatura",
        ]);

        self.institution_phrases.extend([
            "consejo de la judicatura",
            "corte nacional de justicia",
            "corte provincial de justicia",
            "corte constitucional",
            "fiscalia general del estado",
            "defensoria publica",
            "defensoria del pueblo",
            "policia nacional",
            "servicio de rentas internas",
            "servicio nacional de atencion integral",
            "registro civil",
            "instituto ecuatoriano de seguridad social",
            "secretaria de la unidad",
        ]);

        self.corporate_suffixes.extend([
            "s.a.", "s.a", "sa", "s.a.s.", "s.a.s", "sas", "c.a.", "ca.", "ltda", "ltda.",
            "cia", "cia.", "e.p.", "ep", "s.r.l.", "srl", "corp", "corp.", "inc", "inc.",
        ]);
    }

    fn init_roles(&mut self) {
        self.role_titles.extend([
            "director", "directora", "fiscal", "juez", "jueza", "jueces", "conjuez", "conjueza",
            "magistrado", "magistrada", "ministro", "ministra", "secretario", "secretaria",
            "presidente", "presidenta", "defensor", "defensora", "procurador", "procuradora",
            "abogado", "abogada", "perito", "perita", "agente", "gerente", "coordinador",
            "coordinadora", "subteniente", "teniente", "sargento", "cabo", "capitan", "coronel",
            "general", "comandante", "notario", "notaria", "dr.", "dra.", "dr", "dra", "ab.",
            "abg.", "abg", "lcdo.", "lcda.", "lic.", "ing.", "sr.", "sra.", "srta.", "msc.",
            "mgs.", "phd.",
        ]);
    }

    fn init_legal_vocabulary(&mut self) {
        self.legal_work_terms.extend([
            "codigo", "ley", "leyes", "reglamento", "constitucion", "manual", "doctrina",
            "tratado", "convencion", "jurisprudencia", "decreto", "estatuto", "ordenanza",
            "resolucion", "coip", "cogep", "cootad", "losep", "instructivo", "protocolo",
            "pacto", "declaracion",
        ]);

        self.legal_concepts.extend([
            "tutela", "judicial", "efectiva", "debido", "proceso", "seguridad", "juridica",
            "derecho", "derechos", "defensa", "presuncion", "inocencia", "motivacion",
            "legalidad", "proporcionalidad", "culpabilidad", "prueba", "pruebas", "pena",
            "privativa", "libertad", "reparacion", "integral", "dano", "danos",
            "responsabilidad", "penal", "dolo", "culpa", "tipicidad", "antijuridicidad",
            "reincidencia", "agravante", "agravantes", "atenuante", "atenuantes", "nulidad",
            "recurso", "apelacion", "casacion", "sentencia", "audiencia", "medidas",
            "cautelares", "principio", "principios", "garantia", "garantias",
            "constitucionales", "interes", "superior", "flagrancia", "prision", "preventiva",
            "contradiccion", "inmediacion", "oralidad", "publicidad", "igualdad", "dignidad",
            "humana", "materialidad", "infraccion", "nexo", "causal", "teoria", "caso",
            "conducta", "tipica", "antijuridica", "culpable", "juicio", "reproche",
        ]);

        self.concept_suffixes
            .extend(["cion", "sion", "dad", "miento", "encia", "ancia", "ismo"]);
    }

    fn init_function_words(&mut self) {
        self.function_words.extend([
            "el", "la", "los", "las", "lo", "un", "una", "unos", "unas", "de", "del", "al", "a",
            "en", "por", "para", "con", "sin", "sobre", "entre", "hacia", "desde", "y", "e", "o",
            "u", "que", "se", "su", "sus",
        ]);
    }

    fn init_months(&mut self) {
        self.months.extend([
            ("enero", 1),
            ("febrero", 2),
            ("marzo", 3),
            ("abril", 4),
            ("mayo", 5),
            ("junio", 6),
            ("julio", 7),
            ("agosto", 8),
            ("septiembre", 9),
            ("setiembre", 9),
            ("octubre", 10),
            ("noviembre", 11),
            ("diciembre", 12),
        ]);
    }

    /// Compiled structural patterns
    pub fn patterns(&self) -> &PatternBank {
        &self.patterns
    }

    // ------------------------------------------------------------------------
    // Membership tests (normalized input)
    // ------------------------------------------------------------------------

    pub fn is_institution_head(&self, token: &str) -> bool {
        self.institution_heads.contains(token)
    }

    pub fn is_role_title(&self, token: &str) -> bool {
        self.role_titles.contains(token)
    }

    pub fn is_function_word(&self, token: &str) -> bool {
        self.function_words.contains(token)
    }

    /// Whether the normalized span leans ORGANIZATION: an institution head or
    /// phrase appears as a whole token, or a corporate suffix closes the span
    /// or sits inside it.
    pub fn looks_organizational(&self, normalized: &str) -> bool {
        let tokens = tokens_of(normalized);
        if tokens.is_empty() {
            return false;
        }

        if tokens.iter().any(|t| self.institution_heads.contains(t.as_str())) {
            return true;
        }

        let padded = format!(" {normalized} ");
        if self
            .institution_phrases
            .iter()
            .any(|phrase| padded.contains(&format!(" {phrase} ")))
        {
            return true;
        }

        // Suffix or interior token, but never the whole span
        tokens.len() > 1
            && tokens
                .iter()
                .skip(1)
                .any(|t| self.corporate_suffixes.contains(t.as_str()))
    }

    pub fn has_role_title(&self, normalized: &str) -> bool {
        tokens_of(normalized)
            .iter()
            .any(|t| self.role_titles.contains(t.as_str()))
    }

    pub fn has_legal_work_term(&self, normalized: &str) -> bool {
        tokens_of(normalized)
            .iter()
            .any(|t| self.legal_work_terms.contains(t.trim_end_matches('.')))
    }

    /// A span made (almost) entirely of legal-concept vocabulary, or whose
    /// every content word carries an abstract-noun suffix.
    pub fn is_concept_phrase(&self, normalized: &str) -> bool {
        let content: Vec<String> = tokens_of(normalized)
            .into_iter()
            .map(|t| t.trim_end_matches('.').to_string())
            .filter(|t| !t.is_empty() && !self.function_words.contains(t.as_str()))
            .collect();
        if content.is_empty() {
            return false;
        }

        let known = content
            .iter()
            .filter(|t| self.legal_concepts.contains(t.as_str()))
            .count();
        if known * 5 >= content.len() * 4 {
            return true;
        }

        content.iter().all(|t| {
            t.chars().count() >= 5 && self.concept_suffixes.iter().any(|s| t.ends_with(s))
        })
    }

    pub fn month_number(&self, name: &str) -> Option<u32> {
        self.months.get(normalize(name).as_str()).copied()
    }

    // ------------------------------------------------------------------------
    // Dates
    // ------------------------------------------------------------------------

    /// ISO-8601 form of the first date found in `text`, if it is a real
    /// calendar date.
    pub fn iso_date(&self, text: &str) -> Option<String> {
        let p = &self.patterns;

        let date = if let Some(caps) = p.long_date.captures(text) {
            let month = self.month_number(&caps[2])?;
            ymd(&caps, 3, month, 1)
        } else if let Some(caps) = p.numeric_date.captures(text) {
            let month: u32 = caps[2].parse().ok()?;
            ymd(&caps, 3, month, 1)
        } else if let Some(caps) = p.iso_date.captures(text) {
            let month: u32 = caps[2].parse().ok()?;
            ymd(&caps, 1, month, 3)
        } else {
            None
        };

        date.map(|d| d.format("%Y-%m-%d").to_string())
    }
}

impl Default for Gazetteer {
    fn default() -> Self {
        Self::new()
    }
}

fn ymd(caps: &Captures<'_>, year_group: usize, month: u32, day_group: usize) -> Option<NaiveDate> {
    let year: i32 = caps[year_group].parse().ok()?;
    let day: u32 = caps[day_group].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn tokens_of(normalized: &str) -> Vec<String> {
    normalized
        .split(' ')
        .map(normalize_token)
        .filter(|t| !t.is_empty())
        .collect()
}
