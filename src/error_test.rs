use super::*;

#[test]
fn test_err_at_wraps_expr() {
    let res: Result<i32> = err_at!(IOError, "x".parse::<i32>());
    let err = res.unwrap_err();
    assert_eq!(err.0, ErrorKind::IOError);
}

#[test]
fn test_err_at_msg_only() {
    let res: Result<()> = err_at!(Fatal, msg: "bad slot {}", 42);
    let err = res.unwrap_err();
    assert_eq!(err.0, ErrorKind::Fatal);
    assert!(err.1.contains("bad slot 42"));
}

#[test]
fn test_err_at_ok_passthrough() {
    let res: Result<i32> = err_at!(IOError, "42".parse::<i32>());
    assert_eq!(res.unwrap(), 42);
}
