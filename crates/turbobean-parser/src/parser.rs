//! Hand-written recursive-descent parser over the `logos` token stream.
//!
//! The grammar is line-oriented: at top level, every line begins with either
//! a date (a dated directive) or one of the bare keywords `option`,
//! `include`, `plugin`, `pushtag`, `poptag`, `pushmeta`, `popmeta`. Inside a
//! transaction, indented lines are postings or metadata until a blank line
//! or a dedent.

use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use turbobean_core::{
    Amount, Balance, Close, Commodity, Custom, Directive, Document, Event, InternedStr, LotSpec,
    MetaValue, Metadata, Note, Open, Pad, Pnl, PostingRow, PostingTable, PriceAnnotation,
    PriceDirective, PriceKind, Query, TransactionBuilder,
};

use crate::error::{ParseError, ParseErrorKind};
use crate::lexer::{self, Token};
use crate::span::{Span, Spanned};
use crate::ParseResult;

/// A token paired with its byte-offset span, the unit the parser advances
/// over. Named to match the token-based proof-of-concept this parser
/// completes.
#[derive(Debug, Clone)]
struct SpannedToken<'src> {
    token: Token<'src>,
    span: Span,
}

/// Recursive-descent parser state: a token slice and a cursor into it.
struct Parser<'src> {
    tokens: Vec<SpannedToken<'src>>,
    pos: usize,
    errors: Vec<ParseError>,
    active_tags: Vec<String>,
    meta_stack: HashMap<String, Vec<MetaValue>>,
    postings: PostingTable,
}

/// Parse beancount source text into directives, postings, and side-tables.
pub fn parse(source: &str) -> ParseResult {
    let tokens = lexer::tokenize(source)
        .into_iter()
        .map(|(token, span)| SpannedToken { token, span })
        .collect();

    let mut parser = Parser {
        tokens,
        pos: 0,
        errors: Vec::new(),
        active_tags: Vec::new(),
        meta_stack: HashMap::new(),
        postings: PostingTable::new(),
    };

    let mut directives = Vec::new();
    let mut options = Vec::new();
    let mut includes = Vec::new();
    let mut plugins = Vec::new();

    parser.skip_trivia();
    while !parser.at_eof() {
        let start = parser.current_span().start;
        match parser.peek() {
            Some(Token::Date(_)) => {
                if let Some(directive) = parser.parse_dated_directive() {
                    let end_idx = parser.pos.saturating_sub(1).min(parser.tokens.len().saturating_sub(1));
                    let end = parser.tokens.get(end_idx).map(|t| t.span.end).unwrap_or(start);
                    directives.push(Spanned::new(directive, Span::new(start, end.max(start))));
                }
            }
            Some(Token::Option_) => parser.parse_option(&mut options),
            Some(Token::Include) => parser.parse_include(&mut includes),
            Some(Token::Plugin) => parser.parse_plugin(&mut plugins),
            Some(Token::Pushtag) => parser.parse_pushtag(),
            Some(Token::Poptag) => parser.parse_poptag(),
            Some(Token::Pushmeta) => parser.parse_pushmeta(),
            Some(Token::Popmeta) => parser.parse_popmeta(),
            _ => {
                parser.error_here(ParseErrorKind::MissingDirective);
                parser.recover_to_newline();
            }
        }
        parser.skip_trivia();
    }

    ParseResult {
        directives,
        postings: parser.postings,
        options,
        includes,
        plugins,
        errors: parser.errors,
    }
}

fn parse_number(text: &str) -> Result<Decimal, ParseErrorKind> {
    let cleaned: String = text.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&cleaned).map_err(|_| ParseErrorKind::InvalidNumber(text.to_string()))
}

fn parse_date_text(text: &str) -> Result<NaiveDate, ParseErrorKind> {
    let parts: Vec<&str> = text.split(['-', '/']).collect();
    if parts.len() != 3 {
        return Err(ParseErrorKind::InvalidDate(text.to_string()));
    }
    let year: i32 = parts[0]
        .parse()
        .map_err(|_| ParseErrorKind::InvalidDate(text.to_string()))?;
    let month: u32 = parts[1]
        .parse()
        .map_err(|_| ParseErrorKind::InvalidDate(text.to_string()))?;
    let day: u32 = parts[2]
        .parse()
        .map_err(|_| ParseErrorKind::InvalidDate(text.to_string()))?;
    NaiveDate::from_ymd_opt(year, month, day)
        .ok_or_else(|| ParseErrorKind::InvalidDateValue(format!("{year:04}-{month:02}-{day:02}")))
}

fn unescape_string(text: &str) -> String {
    let inner = if text.len() >= 2 {
        &text[1..text.len() - 1]
    } else {
        text
    };
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some(other) => out.push(other),
                None => {}
            }
        } else {
            out.push(c);
        }
    }
    out
}

impl<'src> Parser<'src> {
    fn at_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<Token<'src>> {
        self.tokens.get(self.pos).map(|t| t.token.clone())
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or_else(|| {
                self.tokens
                    .last()
                    .map(|t| Span::new(t.span.end, t.span.end))
                    .unwrap_or_else(|| Span::new(0, 0))
            })
    }

    fn bump(&mut self) -> Option<SpannedToken<'src>> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn error_here(&mut self, kind: ParseErrorKind) {
        let span = self.current_span();
        self.errors.push(ParseError::new(kind, span));
    }

    /// Skip comments, blank newlines, and stray indent markers between
    /// top-level directives.
    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(Token::Comment(_) | Token::Newline | Token::Indent) => {
                    self.bump();
                }
                _ => break,
            }
        }
    }

    /// Consume tokens up to and including the next newline, or EOF.
    fn recover_to_newline(&mut self) {
        while let Some(tok) = self.peek() {
            if matches!(tok, Token::Newline) {
                self.bump();
                break;
            }
            self.bump();
        }
    }

    /// Expect the current line to end here: a newline, a comment, or EOF.
    fn expect_line_end(&mut self) {
        match self.peek() {
            Some(Token::Newline) => {
                self.bump();
            }
            Some(Token::Comment(_)) => {
                self.bump();
                if matches!(self.peek(), Some(Token::Newline)) {
                    self.bump();
                }
            }
            None => {}
            _ => {
                self.error_here(ParseErrorKind::TrailingGarbage);
                self.recover_to_newline();
            }
        }
    }

    fn expect_account(&mut self) -> InternedStr {
        if let Some(Token::Account(a)) = self.peek() {
            self.bump();
            InternedStr::from(a)
        } else {
            self.error_here(ParseErrorKind::MissingAccount);
            InternedStr::from("")
        }
    }

    fn expect_currency(&mut self) -> InternedStr {
        if let Some(Token::Currency(c)) = self.peek() {
            self.bump();
            InternedStr::from(c)
        } else {
            self.error_here(ParseErrorKind::MissingCurrency);
            InternedStr::from("")
        }
    }

    fn expect_string(&mut self) -> String {
        if let Some(Token::String(s)) = self.peek() {
            self.bump();
            unescape_string(s)
        } else {
            self.error_here(ParseErrorKind::Expected("a string".to_string()));
            String::new()
        }
    }

    /// `number? currency?`, either or both possibly absent.
    fn parse_amount_opt(&mut self) -> (Option<Decimal>, Option<InternedStr>) {
        let number = if let Some(Token::Number(s)) = self.peek() {
            self.bump();
            match parse_number(s) {
                Ok(n) => Some(n),
                Err(kind) => {
                    self.error_here(kind);
                    None
                }
            }
        } else {
            None
        };
        let currency = if let Some(Token::Currency(c)) = self.peek() {
            self.bump();
            Some(InternedStr::from(c))
        } else {
            None
        };
        (number, currency)
    }

    fn finalize_meta(&self, mut meta: Metadata) -> Metadata {
        for (key, stack) in &self.meta_stack {
            if let Some(value) = stack.last() {
                meta.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        meta
    }

    fn parse_meta_value(&mut self) -> MetaValue {
        match self.peek() {
            Some(Token::String(s)) => {
                self.bump();
                MetaValue::String(unescape_string(s))
            }
            Some(Token::Account(a)) => {
                self.bump();
                MetaValue::Account(a.to_string())
            }
            Some(Token::Date(d)) => {
                self.bump();
                match parse_date_text(d) {
                    Ok(date) => MetaValue::Date(date),
                    Err(kind) => {
                        self.error_here(kind);
                        MetaValue::None
                    }
                }
            }
            Some(Token::Number(n)) => {
                self.bump();
                match parse_number(n) {
                    Ok(number) => {
                        if let Some(Token::Currency(c)) = self.peek() {
                            self.bump();
                            MetaValue::Amount(Amount::new(number, c))
                        } else {
                            MetaValue::Number(number)
                        }
                    }
                    Err(kind) => {
                        self.error_here(kind);
                        MetaValue::None
                    }
                }
            }
            Some(Token::Currency(c)) => {
                self.bump();
                MetaValue::Currency(c.to_string())
            }
            Some(Token::Tag(t)) => {
                self.bump();
                MetaValue::Tag(t.trim_start_matches('#').to_string())
            }
            Some(Token::Link(l)) => {
                self.bump();
                MetaValue::Link(l.trim_start_matches('^').to_string())
            }
            Some(Token::True) => {
                self.bump();
                MetaValue::Bool(true)
            }
            Some(Token::False) => {
                self.bump();
                MetaValue::Bool(false)
            }
            Some(Token::Null) => {
                self.bump();
                MetaValue::None
            }
            _ => {
                self.error_here(ParseErrorKind::MissingField("metadata value".to_string()));
                MetaValue::None
            }
        }
    }

    /// Consume an indented block of `key: value` lines, used by directives
    /// that carry metadata but no postings.
    fn parse_meta_block(&mut self) -> Metadata {
        let mut meta = Metadata::new();
        while matches!(self.peek(), Some(Token::Indent)) {
            self.bump();
            match self.peek() {
                Some(Token::Comment(_)) => {
                    self.bump();
                }
                Some(Token::MetaKey(key)) => {
                    self.bump();
                    let value = self.parse_meta_value();
                    meta.insert(key.trim_end_matches(':').to_string(), value);
                }
                _ => {
                    self.error_here(ParseErrorKind::SyntaxError(
                        "expected metadata key".to_string(),
                    ));
                }
            }
            self.expect_line_end();
        }
        meta
    }

    fn parse_lot_spec(&mut self) -> LotSpec {
        let total = matches!(self.peek(), Some(Token::LDoubleBrace));
        self.bump();
        let mut spec = LotSpec::empty();
        let closing_is = |tok: &Token<'_>| {
            if total {
                matches!(tok, Token::RDoubleBrace)
            } else {
                matches!(tok, Token::RBrace)
            }
        };

        if !matches!(self.peek(), Some(ref t) if closing_is(t)) {
            loop {
                match self.peek() {
                    Some(Token::Number(n)) => {
                        self.bump();
                        let number = match parse_number(n) {
                            Ok(num) => num,
                            Err(kind) => {
                                self.error_here(kind);
                                Decimal::ZERO
                            }
                        };
                        let currency = if let Some(Token::Currency(c)) = self.peek() {
                            self.bump();
                            Some(InternedStr::from(c))
                        } else {
                            None
                        };
                        if total {
                            if spec.cost_total.is_some() {
                                self.error_here(ParseErrorKind::DuplicateLotComponent(
                                    "cost".to_string(),
                                ));
                            } else {
                                spec.cost_total = Some((number, currency));
                            }
                        } else if spec.cost.is_some() {
                            self.error_here(ParseErrorKind::DuplicateLotComponent(
                                "cost".to_string(),
                            ));
                        } else {
                            spec.cost =
                                Some((number, currency.unwrap_or_else(|| InternedStr::from(""))));
                        }
                    }
                    Some(Token::Date(d)) => {
                        self.bump();
                        match parse_date_text(d) {
                            Ok(date) => {
                                if spec.date.is_some() {
                                    self.error_here(ParseErrorKind::DuplicateLotComponent(
                                        "date".to_string(),
                                    ));
                                } else {
                                    spec.date = Some(date);
                                }
                            }
                            Err(kind) => self.error_here(kind),
                        }
                    }
                    Some(Token::String(s)) => {
                        self.bump();
                        if spec.label.is_some() {
                            self.error_here(ParseErrorKind::DuplicateLotComponent(
                                "label".to_string(),
                            ));
                        } else {
                            spec.label = Some(unescape_string(s));
                        }
                    }
                    Some(Token::Star) => {
                        self.bump();
                        spec.merge = true;
                    }
                    _ => {
                        self.error_here(ParseErrorKind::Expected("a lot component".to_string()));
                        if !matches!(self.peek(), Some(Token::Newline) | None) {
                            self.bump();
                        }
                        break;
                    }
                }
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.bump();
                    continue;
                }
                break;
            }
        }

        match self.peek() {
            Some(ref t) if closing_is(t) => {
                self.bump();
            }
            _ => self.error_here(ParseErrorKind::Expected(
                if total { "}}" } else { "}" }.to_string(),
            )),
        }

        spec
    }

    fn parse_posting(&mut self) -> PostingRow {
        let flag = if let Some(tok) = self.peek() {
            if tok.is_txn_flag() {
                self.bump();
                Some(match tok {
                    Token::Star => '*',
                    Token::Pending => '!',
                    Token::Flag(s) => s.chars().next().unwrap_or('?'),
                    _ => unreachable!(),
                })
            } else {
                None
            }
        } else {
            None
        };

        let account = self.expect_account();
        let (number, currency) = self.parse_amount_opt();
        let mut row = PostingRow {
            account,
            number,
            currency,
            ..PostingRow::default()
        };

        if matches!(self.peek(), Some(Token::At | Token::AtAt)) {
            let total = matches!(self.peek(), Some(Token::AtAt));
            self.bump();
            let (pnum, pcur) = self.parse_amount_opt();
            row.price_kind = if total {
                PriceKind::Total
            } else {
                PriceKind::PerUnit
            };
            row.price_number = pnum;
            row.price_currency = pcur;
        }

        if matches!(self.peek(), Some(Token::LBrace | Token::LDoubleBrace)) {
            row.lot_spec = Some(self.parse_lot_spec());
        }

        if let Some(f) = flag {
            row = row.with_flag(f);
        }

        row
    }

    /// Parse the indented body of a transaction: a run of posting and
    /// metadata lines, metadata attaching to the preceding posting if one
    /// has already been seen, or to the transaction otherwise.
    fn parse_transaction_body(&mut self) -> (Vec<PostingRow>, Metadata) {
        let mut rows: Vec<PostingRow> = Vec::new();
        let mut txn_meta = Metadata::new();

        while matches!(self.peek(), Some(Token::Indent)) {
            self.bump();
            match self.peek() {
                Some(Token::Comment(_)) => {
                    self.bump();
                }
                Some(Token::MetaKey(key)) => {
                    self.bump();
                    let value = self.parse_meta_value();
                    let key = key.trim_end_matches(':').to_string();
                    if let Some(last) = rows.last_mut() {
                        last.meta.insert(key, value);
                    } else {
                        txn_meta.insert(key, value);
                    }
                }
                Some(Token::Account(_)) => {
                    let row = self.parse_posting();
                    rows.push(row);
                }
                _ => {
                    self.error_here(ParseErrorKind::SyntaxError(
                        "expected posting or metadata".to_string(),
                    ));
                }
            }
            self.expect_line_end();
        }

        (rows, txn_meta)
    }

    fn parse_transaction(&mut self, date: NaiveDate) -> Directive {
        let flag = match self.peek() {
            Some(Token::Txn) => {
                self.bump();
                '*'
            }
            Some(tok) if tok.is_txn_flag() => {
                self.bump();
                match tok {
                    Token::Star => '*',
                    Token::Pending => '!',
                    Token::Flag(s) => s.chars().next().unwrap_or('*'),
                    _ => unreachable!(),
                }
            }
            _ => {
                self.error_here(ParseErrorKind::MissingDirective);
                '*'
            }
        };

        let mut strings = Vec::new();
        while let Some(Token::String(s)) = self.peek() {
            self.bump();
            strings.push(unescape_string(s));
        }
        let (payee, narration) = match strings.len() {
            0 => (None, String::new()),
            1 => (None, strings.into_iter().next().unwrap()),
            _ => {
                let mut it = strings.into_iter();
                let payee = it.next();
                let narration = it.next().unwrap_or_default();
                (payee, narration)
            }
        };

        let mut tags = self.active_tags.clone();
        let mut links = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Tag(t)) => {
                    self.bump();
                    let name = t.trim_start_matches('#').to_string();
                    if !tags.contains(&name) {
                        tags.push(name);
                    }
                }
                Some(Token::Link(l)) => {
                    self.bump();
                    links.push(l.trim_start_matches('^').to_string());
                }
                _ => break,
            }
        }

        self.expect_line_end();
        let (rows, txn_meta) = self.parse_transaction_body();

        let mut builder = TransactionBuilder::new(date, narration).with_flag(flag);
        if let Some(payee) = payee {
            builder = builder.with_payee(payee);
        }
        for tag in tags {
            builder = builder.with_tag(tag);
        }
        for link in links {
            builder = builder.with_link(link);
        }
        for (key, value) in self.finalize_meta(txn_meta) {
            builder = builder.with_meta(key, value);
        }
        for row in rows {
            builder = builder.with_posting(row);
        }

        let txn = builder.finish(&mut self.postings);
        Directive::Transaction(txn)
    }

    fn parse_balance(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let account = self.expect_account();
        let (number, currency) = self.parse_amount_opt();
        let amount = match (number, currency) {
            (Some(n), Some(c)) => Amount::new(n, c),
            _ => {
                self.error_here(ParseErrorKind::MissingAmount);
                Amount::zero("")
            }
        };
        let tolerance = if matches!(self.peek(), Some(Token::Tilde)) {
            self.bump();
            if let Some(Token::Number(s)) = self.peek() {
                self.bump();
                parse_number(s).ok()
            } else {
                None
            }
        } else {
            None
        };
        self.expect_line_end();
        let meta = self.parse_meta_block();

        let mut balance = Balance::new(date, account, amount);
        if let Some(tolerance) = tolerance {
            balance = balance.with_tolerance(tolerance);
        }
        balance.meta = self.finalize_meta(meta);
        Directive::Balance(balance)
    }

    fn parse_open(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let account = self.expect_account();
        let mut currencies = Vec::new();
        while let Some(Token::Currency(c)) = self.peek() {
            self.bump();
            currencies.push(InternedStr::from(c));
            if matches!(self.peek(), Some(Token::Comma)) {
                self.bump();
            } else {
                break;
            }
        }
        let booking = if let Some(Token::String(s)) = self.peek() {
            self.bump();
            Some(unescape_string(s))
        } else {
            None
        };
        self.expect_line_end();
        let meta = self.parse_meta_block();

        let mut open = Open::new(date, account).with_currencies(currencies);
        if let Some(booking) = booking {
            open = open.with_booking(booking);
        }
        open.meta = self.finalize_meta(meta);
        Directive::Open(open)
    }

    fn parse_close(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let account = self.expect_account();
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut close = Close::new(date, account);
        close.meta = self.finalize_meta(meta);
        Directive::Close(close)
    }

    fn parse_commodity(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let currency = self.expect_currency();
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut commodity = Commodity::new(date, currency);
        commodity.meta = self.finalize_meta(meta);
        Directive::Commodity(commodity)
    }

    fn parse_pad(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let account = self.expect_account();
        let pad_from = self.expect_account();
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut pad = Pad::new(date, account, pad_from);
        pad.meta = self.finalize_meta(meta);
        Directive::Pad(pad)
    }

    fn parse_event(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let event_type = self.expect_string();
        let value = self.expect_string();
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut event = Event::new(date, event_type, value);
        event.meta = self.finalize_meta(meta);
        Directive::Event(event)
    }

    fn parse_query(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let name = self.expect_string();
        let query = self.expect_string();
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut query = Query::new(date, name, query);
        query.meta = self.finalize_meta(meta);
        Directive::Query(query)
    }

    fn parse_note(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let account = self.expect_account();
        let comment = self.expect_string();
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut note = Note::new(date, account, comment);
        note.meta = self.finalize_meta(meta);
        Directive::Note(note)
    }

    fn parse_document(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let account = self.expect_account();
        let path = self.expect_string();
        let mut tags = Vec::new();
        let mut links = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Tag(t)) => {
                    self.bump();
                    tags.push(t.trim_start_matches('#').to_string());
                }
                Some(Token::Link(l)) => {
                    self.bump();
                    links.push(l.trim_start_matches('^').to_string());
                }
                _ => break,
            }
        }
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut document = Document::new(date, account, path);
        document.tags = tags;
        document.links = links;
        document.meta = self.finalize_meta(meta);
        Directive::Document(document)
    }

    fn parse_price(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let currency = self.expect_currency();
        let (number, amount_currency) = self.parse_amount_opt();
        let amount = match (number, amount_currency) {
            (Some(n), Some(c)) => Amount::new(n, c),
            _ => {
                self.error_here(ParseErrorKind::MissingAmount);
                Amount::zero("")
            }
        };
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut price = PriceDirective::new(date, currency, amount);
        price.meta = self.finalize_meta(meta);
        Directive::Price(price)
    }

    fn parse_custom(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let custom_type = self.expect_string();
        let mut custom = Custom::new(date, custom_type);
        loop {
            match self.peek() {
                Some(Token::Newline | Token::Comment(_)) | None => break,
                Some(Token::Account(a)) => {
                    self.bump();
                    custom = custom.with_value(MetaValue::Account(a.to_string()));
                }
                _ => {
                    let value = self.parse_meta_value();
                    custom = custom.with_value(value);
                }
            }
        }
        self.expect_line_end();
        let meta = self.parse_meta_block();
        custom.meta = self.finalize_meta(meta);
        Directive::Custom(custom)
    }

    fn parse_pnl(&mut self, date: NaiveDate) -> Directive {
        self.bump();
        let from_account = self.expect_account();
        let to_account = self.expect_account();
        self.expect_line_end();
        let meta = self.parse_meta_block();
        let mut pnl = Pnl::new(date, from_account, to_account);
        pnl.meta = self.finalize_meta(meta);
        Directive::Pnl(pnl)
    }

    fn parse_dated_directive(&mut self) -> Option<Directive> {
        let Some(Token::Date(date_text)) = self.peek() else {
            return None;
        };
        self.bump();
        let date = match parse_date_text(date_text) {
            Ok(d) => d,
            Err(kind) => {
                self.error_here(kind);
                self.recover_to_newline();
                return None;
            }
        };

        let directive = match self.peek() {
            Some(Token::Txn) => self.parse_transaction(date),
            Some(tok) if tok.is_txn_flag() => self.parse_transaction(date),
            Some(Token::Balance) => self.parse_balance(date),
            Some(Token::Open) => self.parse_open(date),
            Some(Token::Close) => self.parse_close(date),
            Some(Token::Commodity) => self.parse_commodity(date),
            Some(Token::Pad) => self.parse_pad(date),
            Some(Token::Event) => self.parse_event(date),
            Some(Token::Query) => self.parse_query(date),
            Some(Token::Note) => self.parse_note(date),
            Some(Token::Document) => self.parse_document(date),
            Some(Token::Price) => self.parse_price(date),
            Some(Token::Custom) => self.parse_custom(date),
            Some(Token::Pnl) => self.parse_pnl(date),
            _ => {
                self.error_here(ParseErrorKind::MissingDirective);
                self.recover_to_newline();
                return None;
            }
        };
        Some(directive)
    }

    fn parse_option(&mut self, options: &mut Vec<(String, String, Span)>) {
        let start = self.current_span();
        self.bump();
        let key = self.expect_string();
        let value = self.expect_string();
        let end = self.current_span();
        self.expect_line_end();
        options.push((key, value, start.merge(&end)));
    }

    fn parse_include(&mut self, includes: &mut Vec<(String, Span)>) {
        let start = self.current_span();
        self.bump();
        let path = self.expect_string();
        let end = self.current_span();
        self.expect_line_end();
        includes.push((path, start.merge(&end)));
    }

    fn parse_plugin(&mut self, plugins: &mut Vec<(String, Option<String>, Span)>) {
        let start = self.current_span();
        self.bump();
        let name = self.expect_string();
        let config = if let Some(Token::String(s)) = self.peek() {
            self.bump();
            Some(unescape_string(s))
        } else {
            None
        };
        let end = self.current_span();
        self.expect_line_end();
        plugins.push((name, config, start.merge(&end)));
    }

    fn parse_pushtag(&mut self) {
        self.bump();
        if let Some(Token::Tag(t)) = self.peek() {
            self.bump();
            self.active_tags.push(t.trim_start_matches('#').to_string());
        } else {
            self.error_here(ParseErrorKind::Expected("a tag".to_string()));
        }
        self.expect_line_end();
    }

    fn parse_poptag(&mut self) {
        self.bump();
        if let Some(Token::Tag(t)) = self.peek() {
            self.bump();
            let name = t.trim_start_matches('#').to_string();
            if let Some(pos) = self.active_tags.iter().rposition(|tag| *tag == name) {
                self.active_tags.remove(pos);
            }
        } else {
            self.error_here(ParseErrorKind::Expected("a tag".to_string()));
        }
        self.expect_line_end();
    }

    fn parse_pushmeta(&mut self) {
        self.bump();
        if let Some(Token::MetaKey(key)) = self.peek() {
            self.bump();
            let key = key.trim_end_matches(':').to_string();
            let value = self.parse_meta_value();
            self.meta_stack.entry(key).or_default().push(value);
        } else {
            self.error_here(ParseErrorKind::MissingField("metadata key".to_string()));
        }
        self.expect_line_end();
    }

    fn parse_popmeta(&mut self) {
        self.bump();
        if let Some(Token::MetaKey(key)) = self.peek() {
            self.bump();
            let key = key.trim_end_matches(':');
            if let Some(stack) = self.meta_stack.get_mut(key) {
                stack.pop();
            }
        } else {
            self.error_here(ParseErrorKind::MissingField("metadata key".to_string()));
        }
        self.expect_line_end();
    }
}
