// Copyright (c) 2026 rezky_nightky

use rand::Rng;

/// One immutable catalog entry. Entities hold `&'static Token`; nothing is
/// allocated per drop or per particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token {
    pub text: &'static str,
    pub color: (u8, u8, u8),
}

pub type Snippet = &'static [Token];

const fn tok(text: &'static str, color: (u8, u8, u8)) -> Token {
    Token { text, color }
}

const KEYWORD: (u8, u8, u8) = (86, 156, 214);
const TYPENAME: (u8, u8, u8) = (78, 201, 176);
const STRING: (u8, u8, u8) = (206, 145, 120);
const COMMENT: (u8, u8, u8) = (106, 153, 85);
const FLOW: (u8, u8, u8) = (197, 134, 192);
const FNCALL: (u8, u8, u8) = (220, 220, 170);
const PLAIN: (u8, u8, u8) = (190, 195, 201);
const NUMBER: (u8, u8, u8) = (181, 206, 168);
const IDENT: (u8, u8, u8) = (156, 220, 254);

/// Falling rain tokens: chat, request and training-telemetry fragments.
pub const RAIN: &[Token] = &[
    tok("fn main()", KEYWORD),
    tok("async", FLOW),
    tok("await", FLOW),
    tok("yield", FLOW),
    tok("match msg {", KEYWORD),
    tok("impl Stream", KEYWORD),
    tok("let mut buf", IDENT),
    tok("Ok(())", TYPENAME),
    tok("#[derive(Debug)]", COMMENT),
    tok("=> {}", PLAIN),
    tok("\"role\": \"user\"", STRING),
    tok("\"stream\": true", STRING),
    tok("GET /v1/chat", FNCALL),
    tok("200 OK", COMMENT),
    tok("ws://localhost", IDENT),
    tok("ping 23ms", PLAIN),
    tok("retry in 2s", PLAIN),
    tok("epoch 12/50", NUMBER),
    tok("step 40960", NUMBER),
    tok("loss 0.0421", STRING),
    tok("grad_norm 1.2", STRING),
    tok("acc 97.3%", TYPENAME),
    tok("lr 3e-4", NUMBER),
    tok("batch 64", NUMBER),
    tok("ctx 128k", NUMBER),
    tok("temp 0.7", NUMBER),
    tok("top_p 0.95", NUMBER),
    tok("tokens/s 48.2", TYPENAME),
    tok("eval pending", PLAIN),
    tok("checkpoint saved", COMMENT),
];

const SNIPPET_REQUEST: &[Token] = &[
    tok("let req = client", IDENT),
    tok("    .post(\"/v1/chat\")", FNCALL),
    tok("    .json(&body);", FNCALL),
    tok("let res = req.await?;", IDENT),
];

const SNIPPET_TRAIN: &[Token] = &[
    tok("for batch in loader {", KEYWORD),
    tok("    let loss = model(batch);", IDENT),
    tok("    loss.backward();", FNCALL),
    tok("}", KEYWORD),
];

const SNIPPET_SOCKET: &[Token] = &[
    tok("ws.on_message(|msg| {", FNCALL),
    tok("    state.push(msg);", IDENT),
    tok("    redraw();", FNCALL),
    tok("});", PLAIN),
];

/// Pre-authored multi-line blocks for the codeblock sub-animation.
pub const SNIPPETS: &[Snippet] = &[SNIPPET_REQUEST, SNIPPET_TRAIN, SNIPPET_SOCKET];

/// Short tokens thrown by click bursts. Kept to a few characters so the
/// vertical orientation still fits on screen.
pub const BURST: &[Token] = &[
    tok("+1", TYPENAME),
    tok("ok", COMMENT),
    tok("ack", PLAIN),
    tok("sent", IDENT),
    tok("ping", FNCALL),
    tok("::", KEYWORD),
    tok("=>", FLOW),
    tok("{}", PLAIN),
    tok("[]", PLAIN),
    tok("?", STRING),
];

pub fn pick_rain<R: Rng>(rng: &mut R) -> &'static Token {
    &RAIN[rng.random_range(0..RAIN.len())]
}

pub fn pick_burst<R: Rng>(rng: &mut R) -> &'static Token {
    &BURST[rng.random_range(0..BURST.len())]
}

pub fn pick_snippet<R: Rng>(rng: &mut R) -> Snippet {
    SNIPPETS[rng.random_range(0..SNIPPETS.len())]
}

/// A rain token guaranteed to differ from `original`, for the edit
/// sub-animation's replacement text.
pub fn pick_replacement<R: Rng>(rng: &mut R, original: &Token) -> &'static Token {
    let mut idx = rng.random_range(0..RAIN.len());
    if RAIN[idx].text == original.text {
        idx = (idx + 1) % RAIN.len();
    }
    &RAIN[idx]
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn catalogs_are_populated() {
        assert!(RAIN.len() > 1);
        assert!(!BURST.is_empty());
        assert!(!SNIPPETS.is_empty());
        for s in SNIPPETS {
            assert!(s.len() >= 2);
            for line in *s {
                assert!(!line.text.is_empty());
            }
        }
    }

    #[test]
    fn burst_tokens_stay_short() {
        for t in BURST {
            assert!(t.text.chars().count() <= 4, "{} too long", t.text);
        }
    }

    #[test]
    fn replacement_never_matches_original() {
        let mut rng = StdRng::seed_from_u64(11);
        for original in RAIN {
            for _ in 0..8 {
                let r = pick_replacement(&mut rng, original);
                assert_ne!(r.text, original.text);
            }
        }
    }
}
