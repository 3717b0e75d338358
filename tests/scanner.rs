#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use rlox::error::LoxError;
    use rlox::scanner::*;
    use rlox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn assert_token_matches(
        result: &Result<Token, LoxError>,
        expected_type: TokenType,
        expected_lexeme: &str,
    ) {
        match result {
            Ok(token) => {
                assert_eq!(
                    token.token_type, expected_type,
                    "Expected token type {:?}, got {:?}",
                    expected_type, token.token_type
                );
                assert_eq!(token.lexeme, expected_lexeme);
            }
            Err(e) => panic!("Expected token but got error: {}", e),
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / || &&",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::OR, "||"),
                (TokenType::AND, "&&"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "function fun class classy _tmp this super",
            &[
                (TokenType::FUNCTION, "function"),
                (TokenType::IDENTIFIER, "fun"),
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "classy"),
                (TokenType::IDENTIFIER, "_tmp"),
                (TokenType::THIS, "this"),
                (TokenType::SUPER, "super"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literals_carry_values() {
        let (tokens, errors) = scan_tokens("\"hi there\" 12.5 7 8.");
        assert!(errors.is_empty());

        match &tokens[0].token_type {
            TokenType::STRING(s) => assert_eq!(s, "hi there"),
            other => panic!("expected string, got {:?}", other),
        }
        match tokens[1].token_type {
            TokenType::NUMBER(n) => assert_eq!(n, 12.5),
            ref other => panic!("expected number, got {:?}", other),
        }

        // A trailing dot is not part of the number.
        assert_eq!(tokens[3].lexeme, "8");
        assert_eq!(tokens[4].token_type, TokenType::DOT);
    }

    #[test]
    fn test_scanner_05_display_form() {
        let (tokens, _) = scan_tokens("var x = 42; \"s\" 1.5");
        let shown: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();

        assert_eq!(
            shown,
            vec![
                "VAR var null",
                "IDENTIFIER x null",
                "EQUAL = null",
                "NUMBER 42 42.0",
                "SEMICOLON ; null",
                "STRING \"s\" s",
                "NUMBER 1.5 1.5",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error '$', LEFT_PAREN, error '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $",
                "[line 1] Error: Unexpected character: #",
            ]
        );
    }

    #[test]
    fn lone_pipe_is_unexpected() {
        let (tokens, errors) = scan_tokens("a | b");
        assert_eq!(errors.len(), 1);
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn multibyte_character_is_skipped_whole() {
        let (tokens, errors) = scan_tokens("é1");
        assert_eq!(errors[0].to_string(), "[line 1] Error: Unexpected character: é");
        assert_eq!(tokens[0].lexeme, "1");
    }

    #[test]
    fn comments_and_whitespace_are_skipped() {
        assert_token_sequence(
            "// leading comment\n  print 1; // trailing\n",
            &[
                (TokenType::PRINT, "print"),
                (TokenType::NUMBER(0.0), "1"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn exactly_one_eof_is_emitted() {
        for source in ["", "   ", "var", "\"open", "@@@"] {
            let (tokens, _) = scan_tokens(source);
            let eofs = tokens
                .iter()
                .filter(|t| t.token_type == TokenType::EOF)
                .count();
            assert_eq!(eofs, 1, "source {:?}", source);
            assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
        }
    }

    #[test]
    fn multiline_string_advances_line_counter() {
        let (tokens, errors) = scan_tokens("\"a\nb\nc\" x");
        assert!(errors.is_empty());

        let x = tokens
            .iter()
            .find(|t| t.lexeme == "x")
            .map(|t| t.line);
        assert_eq!(x, Some(3));
    }

    #[test]
    fn unterminated_string_is_reported() {
        let (tokens, errors) = scan_tokens("print \"never closed\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].to_string(), "[line 2] Error: Unterminated string.");
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn iterator_is_fused_after_eof() {
        let mut scanner = Scanner::new("1");
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_some());
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
