use chip8::Key;
use winit::keyboard::KeyCode;

/// Map a physical key on a QWERTY layout to the hexadecimal keypad
pub fn key_for(code: KeyCode) -> Option<Key> {
    let value = match code {
        KeyCode::Digit1 => 0x1, // 1 -> 1
        KeyCode::Digit2 => 0x2, // 2 -> 2
        KeyCode::Digit3 => 0x3, // 3 -> 3
        KeyCode::Digit4 => 0xC, // 4 -> C
        KeyCode::KeyQ => 0x4,   // Q -> 4
        KeyCode::KeyW => 0x5,   // W -> 5
        KeyCode::KeyE => 0x6,   // E -> 6
        KeyCode::KeyR => 0xD,   // R -> D
        KeyCode::KeyA => 0x7,   // A -> 7
        KeyCode::KeyS => 0x8,   // S -> 8
        KeyCode::KeyD => 0x9,   // D -> 9
        KeyCode::KeyF => 0xE,   // F -> E
        KeyCode::KeyZ => 0xA,   // Z -> A
        KeyCode::KeyX => 0x0,   // X -> 0
        KeyCode::KeyC => 0xB,   // C -> B
        KeyCode::KeyV => 0xF,   // V -> F
        _ => return None,
    };
    Key::new(value)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use winit::keyboard::KeyCode;

    use super::key_for;

    #[test]
    fn test_covers_every_key_once() {
        let codes = [
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
            KeyCode::KeyQ,
            KeyCode::KeyW,
            KeyCode::KeyE,
            KeyCode::KeyR,
            KeyCode::KeyA,
            KeyCode::KeyS,
            KeyCode::KeyD,
            KeyCode::KeyF,
            KeyCode::KeyZ,
            KeyCode::KeyX,
            KeyCode::KeyC,
            KeyCode::KeyV,
        ];
        let keys: HashSet<u8> = codes
            .into_iter()
            .filter_map(key_for)
            .map(|key| key.code())
            .collect();
        assert_eq!(keys, (0..0x10).collect());
    }

    #[test]
    fn test_unmapped() {
        assert_eq!(key_for(KeyCode::Escape), None);
        assert_eq!(key_for(KeyCode::Digit5), None);
    }
}
