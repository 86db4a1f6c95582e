use httpdns::expr::{evaluate, Condition, Operator, RequestContext};

fn context(pairs: &[(&str, &str)]) -> RequestContext {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_numeric_operators() {
    assert!(evaluate(&Operator::Gte, Some("20"), "15"));
    assert!(evaluate(&Operator::Gte, Some("15"), "15"));
    assert!(!evaluate(&Operator::Gt, Some("15"), "15"));
    assert!(evaluate(&Operator::Lt, Some("-3"), "0"));
    assert!(evaluate(&Operator::Lte, Some(" 99999 "), "99999"));
    assert!(evaluate(&Operator::Gt, Some("1.5"), "1"));
}

#[test]
fn test_malformed_numeric_is_false() {
    // 非数字的实际值或期望值都不会匹配，也不会出错
    assert!(!evaluate(&Operator::Gte, Some("abc"), "15"));
    assert!(!evaluate(&Operator::Lt, Some("abc"), "15"));
    assert!(!evaluate(&Operator::Gte, Some("20"), "fifteen"));
    assert!(!evaluate(&Operator::Lte, Some(""), "15"));
    assert!(!evaluate(&Operator::Gt, Some("NaN"), "0"));
    assert!(!evaluate(&Operator::Gt, None, "0"));
}

#[test]
fn test_equality_operators() {
    assert!(evaluate(&Operator::Eq, Some("v1"), "v1"));
    assert!(!evaluate(&Operator::Eq, Some("v1"), "V1"));
    assert!(evaluate(&Operator::Neq, Some("v1"), "v2"));

    // 缺失字段按字面值 "None" 比较
    assert!(evaluate(&Operator::Eq, None, "None"));
    assert!(evaluate(&Operator::Neq, None, "v1"));
}

#[test]
fn test_membership_operators() {
    assert!(evaluate(&Operator::In, Some("v1"), "v1,v2"));
    assert!(evaluate(&Operator::In, Some("v2"), "v1,v2"));
    assert!(!evaluate(&Operator::In, Some("v3"), "v1,v2"));
    // 不去除空白
    assert!(!evaluate(&Operator::In, Some("v2"), "v1, v2"));
    assert!(evaluate(&Operator::Nin, Some("v3"), "v1,v2"));
    assert!(!evaluate(&Operator::Nin, Some("v1"), "v1,v2"));

    assert!(!evaluate(&Operator::In, None, "v1,v2"));
    assert!(evaluate(&Operator::In, None, "v1,None"));
    assert!(evaluate(&Operator::Nin, None, "v1,v2"));
}

#[test]
fn test_regex_operator() {
    let pattern = r"^v\d{1,3}$";
    assert!(evaluate(&Operator::Regex, Some("v1"), pattern));
    assert!(evaluate(&Operator::Regex, Some("v123"), pattern));
    assert!(!evaluate(&Operator::Regex, Some("v1234"), pattern));
    assert!(!evaluate(&Operator::Regex, Some("x1"), pattern));

    // 匹配任意位置
    assert!(evaluate(&Operator::Regex, Some("abc-123"), r"\d+"));

    // 无效正则和缺失字段都返回 false
    assert!(!evaluate(&Operator::Regex, Some("v1"), "(unclosed"));
    assert!(!evaluate(&Operator::Regex, None, ".*"));
}

#[test]
fn test_predicate_operator() {
    assert!(evaluate(&Operator::Predicate, Some("v3"), "equals('v3')"));
    assert!(!evaluate(&Operator::Predicate, Some("v4"), "equals('v3')"));
    assert!(evaluate(
        &Operator::Predicate,
        Some("mobile-app"),
        "starts_with('mobile') && !contains('test')"
    ));

    // 任意代码形式的表达式不会被执行，只会得到 false
    assert!(!evaluate(&Operator::Predicate, Some("v3"), "x == 'v3'"));
    assert!(!evaluate(
        &Operator::Predicate,
        Some("v3"),
        "__import__('os').system('true')"
    ));
    assert!(!evaluate(&Operator::Predicate, None, "is_empty()"));
}

#[test]
fn test_unsupported_operator_is_false() {
    let operator = Operator::from("$between");
    assert!(!evaluate(&operator, Some("5"), "1,10"));
    assert!(!evaluate(&operator, None, "None"));
}

#[test]
fn test_condition_matches_context() {
    let ctx = context(&[("field_1", "v1"), ("field_2", "20")]);

    assert!(Condition::new("$in", "field_1", "v1,v2").matches(&ctx));
    assert!(Condition::new("$gte", "field_2", "15").matches(&ctx));
    assert!(!Condition::new("$gte", "field_3", "15").matches(&ctx));
    assert!(Condition::new("$eq", "field_3", "None").matches(&ctx));
}

#[test]
fn test_condition_serde_shape() {
    let condition: Condition = serde_json::from_str(r#"["$gte", "field_2", 15]"#).unwrap();
    assert_eq!(condition, Condition::new(Operator::Gte, "field_2", "15"));

    // 序列化为标准名称和字符串期望值
    let text = serde_json::to_string(&condition).unwrap();
    assert_eq!(text, r#"["gte","field_2","15"]"#);

    // 三元组以外的形状无法解析
    assert!(serde_json::from_str::<Condition>(r#"["$gte", "field_2"]"#).is_err());
}

#[test]
fn test_deeply_nested_predicate_is_false() {
    // 过深或过长的谓词被拒绝，只会得到 false
    let long = format!("{}is_empty()", "!".repeat(100_000));
    assert!(!evaluate(&Operator::Predicate, Some(""), &long));

    let nested = format!("{}is_empty(){}", "(".repeat(1000), ")".repeat(1000));
    assert!(!evaluate(&Operator::Predicate, Some(""), &nested));

    let ctx = context(&[("field_1", "")]);
    assert!(!Condition::new("predicate", "field_1", long).matches(&ctx));

    // 上限以内的嵌套正常求值
    let shallow = format!("{}is_empty()", "!".repeat(10));
    assert!(evaluate(&Operator::Predicate, Some(""), &shallow));
}
