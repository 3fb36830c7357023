//! Built-in French stop-word list.
//!
//! Function words that never make useful concepts on their own. Matched
//! against whole normalized candidates, so multi-word phrases are only
//! rejected when they equal an entry exactly.

pub const FRENCH: &[&str] = &[
    "a", "à", "afin", "ai", "aie", "aient", "aies", "ailleurs", "ainsi", "ait", "alors", "après",
    "as", "assez", "au", "aucun", "aucune", "aujourd'hui", "auquel", "aura", "aurai", "auraient",
    "aurais", "aurait", "auras", "aurez", "auriez", "aurions", "aurons", "auront", "aussi",
    "autant", "autre", "autres", "aux", "auxquelles", "auxquels", "avaient", "avais", "avait",
    "avant", "avec", "avez", "aviez", "avions", "avoir", "avons", "ayant", "beaucoup", "bien",
    "bon", "c'", "ça", "car", "ce", "ceci", "cela", "celle", "celles", "celui", "cependant",
    "certain", "certaine", "certaines", "certains", "ces", "cet", "cette", "ceux", "chacun",
    "chacune", "chaque", "chez", "ci", "comme", "comment", "contre", "d'", "dans", "de", "dedans",
    "dehors", "déjà", "depuis", "des", "desquelles", "desquels", "dessous", "dessus", "deux",
    "devant", "doit", "donc", "dont", "du", "duquel", "durant", "elle", "elles", "en", "encore",
    "entre", "es", "est", "et", "étaient", "étais", "était", "étant", "été", "être", "eu", "eux",
    "fait", "faire", "fais", "font", "hormis", "hors", "ici", "il", "ils", "j'", "jamais", "je",
    "jusqu'", "jusque", "l'", "la", "là", "laquelle", "le", "lequel", "les", "lesquelles",
    "lesquels", "leur", "leurs", "lui", "m'", "ma", "mais", "malgré", "me", "même", "mêmes",
    "mes", "moi", "moins", "mon", "n'", "ne", "néanmoins", "ni", "non", "nos", "notre", "nous",
    "on", "ont", "or", "ou", "où", "par", "parce", "parmi", "pas", "peu", "peut", "peuvent",
    "plupart", "plus", "plusieurs", "pour", "pourquoi", "pourtant", "près", "puis", "puisque",
    "qu'", "quand", "que", "quel", "quelle", "quelles", "quels", "qui", "quoi", "s'", "sa",
    "sans", "se", "selon", "ses", "si", "sien", "sienne", "siennes", "siens", "sinon", "soi",
    "soit", "son", "sont", "sous", "suis", "sur", "t'", "ta", "tandis", "tant", "te", "tel",
    "telle", "telles", "tels", "tes", "toi", "ton", "tous", "tout", "toute", "toutes", "très",
    "trop", "tu", "un", "une", "unes", "uns", "va", "vers", "voici", "voilà", "vos", "votre",
    "vous", "y",
];

/// Whether `term` is a built-in stop word.
pub fn is_stop_word(term: &str) -> bool {
    FRENCH.contains(&term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_function_words_are_stop_words() {
        for w in ["le", "avec", "être", "cela"] {
            assert!(is_stop_word(w), "{w} should be a stop word");
        }
        assert!(!is_stop_word("liberté"));
    }
}
