use nom::{
    IResult,
    character::complete::{alpha1, alphanumeric0, char, one_of, satisfy, u32},
    combinator::{all_consuming, cut, map, not, opt, recognize},
    multi::many0,
    sequence::{delimited, pair, preceded, separated_pair, tuple},
};

use crate::{
    LipidChain, Modifier, Modifiers, SialicClass,
    errors::{NameErrorKind, NameParseError, ParseFailure},
    identity::Series,
};

pub(crate) type ParseResult<'s, O> = IResult<&'s str, O, ParseFailure<'s>>;

// NOTE: The prefix grammar doesn't need its modifiers to be normalised yet, that's left to `Modifiers`
pub(crate) type Prefix<'s> = (&'s str, Modifiers);

/// Name = Prefix , [ "(" , Chain , ")" ] ;
pub(crate) fn name(i: &str) -> ParseResult<(Prefix<'_>, Option<LipidChain>)> {
    let chain_start = expect(char('('), NameErrorKind::ExpectedChainStart);
    let chain_end = expect(char(')'), NameErrorKind::ExpectedChainEnd);
    let chain = delimited(chain_start, cut(lipid_chain), cut(chain_end));
    pair(prefix, opt(chain))(i)
}

/// Prefix = Head , { "+" , [ Count ] , Modifier } ;
pub(crate) fn prefix(i: &str) -> ParseResult<Prefix<'_>> {
    let modifier_term = preceded(char('+'), cut(pair(opt(count), modifier)));
    let modifiers = map(many0(modifier_term), |terms| {
        terms
            .into_iter()
            .map(|(count, modifier)| (modifier, count.unwrap_or(1)))
            .collect()
    });
    pair(head, modifiers)(i)
}

/// Chain = Count , ":" , Digits , [ ";" , "O" , [ Count ] ] ;
pub(crate) fn lipid_chain(i: &str) -> ParseResult<LipidChain> {
    let separator = expect(char(':'), NameErrorKind::ExpectedChainSeparator);
    let double_bonds = expect(u32, NameErrorKind::ExpectedDigit);
    let oxygens = preceded(pair(char(';'), char('O')), opt(count));
    let parser = tuple((
        separated_pair(count, separator, double_bonds),
        opt(map(oxygens, |o| o.unwrap_or(1))),
    ));
    let chain = map(parser, |((carbons, double_bonds), oxygens)| {
        LipidChain::new(carbons, double_bonds, oxygens.unwrap_or_default())
    });
    wrap_err(chain, NameErrorKind::ExpectedChain)(i)
}

/// Series = "G" , Sialic Class , digit , [ lowercase ] ;
pub(crate) fn series(i: &str) -> ParseResult<Series> {
    let sialic_class = map(one_of("AMDTQP"), |c| match c {
        'A' => SialicClass::Asialo,
        'M' => SialicClass::Mono,
        'D' => SialicClass::Di,
        'T' => SialicClass::Tri,
        'Q' => SialicClass::Tetra,
        'P' => SialicClass::Penta,
        _ => unreachable!(),
    });
    let digit = map(satisfy(|c| c.is_ascii_digit()), |c| {
        // SAFETY: `satisfy` has already checked that this is an ASCII digit
        c.to_digit(10).unwrap() as u8
    });
    let isomer = opt(satisfy(|c| c.is_ascii_lowercase()));
    let parser = preceded(char('G'), tuple((sialic_class, digit, isomer)));
    map(parser, |(class, digit, isomer)| Series::new(class, digit, isomer))(i)
}

// Private Sub-Parsers =================================================================================================

/// Head = letter , { letter | digit } ;
fn head(i: &str) -> ParseResult<&str> {
    let parser = recognize(pair(alpha1, alphanumeric0));
    expect(parser, NameErrorKind::ExpectedHead)(i)
}

/// Modifier = letter , { letter } ;
fn modifier(i: &str) -> ParseResult<Modifier> {
    let parser = map(alpha1, Modifier::from_abbr);
    expect(parser, NameErrorKind::ExpectedModifier)(i)
}

/// Count = digit - "0" , { digit } ;
fn count(i: &str) -> ParseResult<u32> {
    let not_zero = expect(not(char('0')), NameErrorKind::ExpectedNoLeadingZero);
    let digits = expect(u32, NameErrorKind::ExpectedDigit);
    preceded(not_zero, digits)(i)
}

// Error Plumbing ======================================================================================================

/// Runs `parser` over the whole of `input`, converting any failure into a `NameParseError` pointing at the spot
/// where parsing stopped
pub(crate) fn final_parse<'s, O>(
    parser: impl FnMut(&'s str) -> ParseResult<'s, O>,
    input: &'s str,
) -> Result<O, NameParseError> {
    all_consuming(parser)(input)
        .map(|(_, output)| output)
        .map_err(|e| match e {
            nom::Err::Error(failure) | nom::Err::Failure(failure) => {
                let offset = input.len() - failure.input.len();
                NameParseError::new(input, offset, failure.kind)
            }
            // NOTE: Only the `streaming` parsers can return `Incomplete`, and none are used here
            nom::Err::Incomplete(_) => {
                NameParseError::new(input, input.len(), NameErrorKind::Incomplete)
            }
        })
}

/// Replaces the kind of any error returned by `parser`, keeping the position it failed at
fn expect<'s, O>(
    mut parser: impl FnMut(&'s str) -> ParseResult<'s, O>,
    kind: NameErrorKind,
) -> impl FnMut(&'s str) -> ParseResult<'s, O> {
    move |i| {
        parser(i).map_err(|e| e.map(|ParseFailure { input, .. }| ParseFailure::new(input, kind.clone())))
    }
}

/// Like `expect`, but reports the failure at the start of the wrapped parser's input
fn wrap_err<'s, O>(
    mut parser: impl FnMut(&'s str) -> ParseResult<'s, O>,
    kind: NameErrorKind,
) -> impl FnMut(&'s str) -> ParseResult<'s, O> {
    move |i| parser(i).map_err(|e| e.map(|_| ParseFailure::new(i, kind.clone())))
}

// Module Tests ========================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count() {
        // Valid Counts
        assert_eq!(count("1"), Ok(("", 1)));
        assert_eq!(count("10"), Ok(("", 10)));
        assert_eq!(count("36"), Ok(("", 36)));
        // Invalid Counts
        assert!(count("0").is_err());
        assert!(count("02").is_err());
        assert!(count("OAc").is_err());
        assert!(count("+2").is_err());
        // Multiple Counts
        assert_eq!(count("2OAc"), Ok(("OAc", 2)));
    }

    #[test]
    fn test_head() {
        // Valid Heads
        assert_eq!(head("GD1a"), Ok(("", "GD1a")));
        assert_eq!(head("GM3"), Ok(("", "GM3")));
        assert_eq!(head("LacCer"), Ok(("", "LacCer")));
        // Invalid Heads
        assert!(head("1GD").is_err());
        assert!(head("+OAc").is_err());
        assert!(head("(36:1;O2)").is_err());
        // Heads Followed By Modifiers
        assert_eq!(head("GD1+OAc"), Ok(("+OAc", "GD1")));
        assert_eq!(head("GT1b(36:1;O2)"), Ok(("(36:1;O2)", "GT1b")));
    }

    #[test]
    fn test_prefix() {
        let (rest, (head, modifiers)) = prefix("GD1+dHex+2OAc").unwrap();
        assert_eq!(rest, "");
        assert_eq!(head, "GD1");
        assert_eq!(modifiers.count(&Modifier::DHex), 1);
        assert_eq!(modifiers.count(&Modifier::OAc), 2);

        // Repeated modifiers accumulate
        let (_, (_, modifiers)) = prefix("GM1+OAc+OAc").unwrap();
        assert_eq!(modifiers.count(&Modifier::OAc), 2);

        // A dangling '+' is a hard failure, not a backtrack
        assert!(matches!(prefix("GD1+"), Err(nom::Err::Failure(_))));
        assert!(matches!(prefix("GD1+0OAc"), Err(nom::Err::Failure(_))));
    }

    #[test]
    fn test_lipid_chain() {
        assert_eq!(lipid_chain("36:1;O2"), Ok(("", LipidChain::new(36, 1, 2))));
        assert_eq!(lipid_chain("38:0;O"), Ok(("", LipidChain::new(38, 0, 1))));
        assert_eq!(lipid_chain("18:1"), Ok(("", LipidChain::new(18, 1, 0))));
        assert_eq!(lipid_chain("36:1;O2)"), Ok((")", LipidChain::new(36, 1, 2))));
        // Invalid Chains
        assert!(lipid_chain("36").is_err());
        assert!(lipid_chain(":1;O2").is_err());
        assert!(lipid_chain("036:1").is_err());
    }

    #[test]
    fn test_series() {
        assert_eq!(
            series("GD1a"),
            Ok(("", Series::new(SialicClass::Di, 1, Some('a'))))
        );
        assert_eq!(
            series("GM3"),
            Ok(("", Series::new(SialicClass::Mono, 3, None)))
        );
        assert_eq!(
            series("GA1"),
            Ok(("", Series::new(SialicClass::Asialo, 1, None)))
        );
        assert!(series("GX1").is_err());
        assert!(series("LacCer").is_err());
        assert!(series("GD").is_err());
    }

    #[test]
    fn test_final_parse_offsets() {
        let error = final_parse(name, "GD1+OAc(36:1;O2").unwrap_err();
        assert_eq!(error.kind(), &NameErrorKind::ExpectedChainEnd);
        assert_eq!(error.offset(), 15);

        let error = final_parse(name, "GD1+(36:1;O2)").unwrap_err();
        assert_eq!(error.kind(), &NameErrorKind::ExpectedModifier);
        assert_eq!(error.offset(), 4);

        let error = final_parse(name, "GD1(36:1;O2) extra").unwrap_err();
        assert_eq!(error.kind(), &NameErrorKind::Incomplete);
        assert_eq!(error.offset(), 12);
    }
}
