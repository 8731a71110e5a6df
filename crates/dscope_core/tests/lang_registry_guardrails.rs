use std::collections::HashMap;

use dscope_core::lang::keywords;
use dscope_core::lang::operators;
use dscope_core::lang::punctuation;

#[test]
fn keyword_table_is_ordered_by_id() {
    for (index, info) in keywords::KEYWORDS.iter().enumerate() {
        assert_eq!(info.id as usize, index, "keyword {:?} is out of order", info.id);
    }
}

#[test]
fn keywords_spellings_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, keywords::KeywordId> = HashMap::new();

    for info in keywords::KEYWORDS {
        assert_eq!(
            keywords::from_str(info.canonical),
            Some(info.id),
            "keyword canonical spelling not resolvable: {}",
            info.canonical
        );
        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!(
                "duplicate keyword spelling {:?}: {:?} and {:?}",
                info.canonical, prev, info.id
            );
        }
    }
}

#[test]
fn operator_table_is_ordered_and_unique() {
    let mut seen = HashMap::new();
    for (index, info) in operators::OPERATORS.iter().enumerate() {
        assert_eq!(info.id as usize, index, "operator {:?} is out of order", info.id);
        assert_eq!(operators::from_str(info.spelling), Some(info.id));
        assert!(
            seen.insert(info.spelling, info.id).is_none(),
            "duplicate operator spelling {}",
            info.spelling
        );
        assert!(
            punctuation::from_str(info.spelling).is_none(),
            "operator spelling {} is also punctuation",
            info.spelling
        );
    }
}

#[test]
fn punctuation_table_is_ordered_and_unique() {
    let mut seen = HashMap::new();
    for (index, info) in punctuation::PUNCTUATION.iter().enumerate() {
        assert_eq!(info.id as usize, index, "punctuation {:?} is out of order", info.id);
        assert_eq!(punctuation::from_str(info.canonical), Some(info.id));
        assert!(seen.insert(info.canonical, info.id).is_none());
    }
}

#[test]
fn category_helpers_agree_with_table() {
    use keywords::KeywordId;

    assert!(keywords::is_basic_type(KeywordId::Creal));
    assert!(!keywords::is_basic_type(KeywordId::Auto));
    assert!(keywords::is_storage_class(KeywordId::Immutable));
    assert!(keywords::is_storage_class(KeywordId::Gshared));
    assert!(keywords::is_type_constructor(KeywordId::Inout));
    assert!(keywords::is_protection(KeywordId::Package));
    assert!(keywords::is_parameter_storage_class(KeywordId::Lazy));
    assert!(!keywords::is_parameter_storage_class(KeywordId::Static));
    assert!(operators::is_assignment(operators::OperatorId::UShrEq));
    assert!(!operators::is_assignment(operators::OperatorId::EqEq));
}
